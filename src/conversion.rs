//! Conversion ratios between currencies of the current rate table.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::core::{ConversionError, RateSnapshot};
use crate::store::RateStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub date: NaiveDate,
    pub base: String,
    /// Units of each target currency per unit of the base currency.
    pub rates: BTreeMap<String, f64>,
}

#[derive(Clone)]
pub struct ConversionService {
    store: Arc<RateStore>,
}

impl ConversionService {
    pub fn new(store: Arc<RateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RateStore> {
        &self.store
    }

    /// Converts `base` into every currency of `targets` using whatever rates
    /// are loaded right now. A due refresh is started but never waited on.
    pub fn convert<S: AsRef<str>>(
        &self,
        base: &str,
        targets: &[S],
    ) -> Result<Conversion, ConversionError> {
        self.store.trigger_refresh_if_expired(Instant::now());
        let snapshot = self
            .store
            .current_snapshot()
            .ok_or(ConversionError::InvalidCurrency)?;
        compute_conversion(&snapshot, base, targets)
    }

    /// Codes of all currencies in the current rate table.
    pub fn list_supported(&self) -> Result<Vec<String>, ConversionError> {
        self.store.trigger_refresh_if_expired(Instant::now());
        let snapshot = self
            .store
            .current_snapshot()
            .ok_or(ConversionError::InvalidCurrency)?;
        Ok(snapshot.currencies().map(str::to_string).collect())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Computes `rate(base) / rate(target)` for each target independently.
pub fn compute_conversion<S: AsRef<str>>(
    snapshot: &RateSnapshot,
    base: &str,
    targets: &[S],
) -> Result<Conversion, ConversionError> {
    let base = normalize_code(base);
    if base.is_empty() || targets.is_empty() {
        return Err(ConversionError::InvalidCurrency);
    }
    let base_rate = snapshot
        .rate(&base)
        .ok_or(ConversionError::InvalidCurrency)?;

    let mut rates = BTreeMap::new();
    for target in targets {
        let target = normalize_code(target.as_ref());
        let target_rate = snapshot.rate(&target).ok_or_else(|| {
            debug!(%target, "Unsupported target currency");
            ConversionError::InvalidCurrency
        })?;
        rates.insert(target, base_rate / target_rate);
    }

    Ok(Conversion {
        date: snapshot.date(),
        base,
        rates,
    })
}
