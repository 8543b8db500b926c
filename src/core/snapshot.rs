//! Immutable point-in-time rate tables

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::warn;

use super::FetchError;

/// Code of the currency every rate is quoted against.
pub const EURO: &str = "EUR";

/// A table of currency code to the value of one euro in that currency.
///
/// Every rate is strictly positive and finite, and `EUR` is always present
/// with a rate of 1.0. A snapshot is never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    date: NaiveDate,
    rates: BTreeMap<String, f64>,
}

impl RateSnapshot {
    /// Builds a snapshot from upstream pairs, dropping entries that would break
    /// the table's invariants.
    ///
    /// Fails when no usable non-euro rate remains.
    pub fn new<I>(date: NaiveDate, pairs: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut rates = BTreeMap::new();
        for (code, rate) in pairs {
            let code = code.trim().to_uppercase();
            if !is_currency_code(&code) {
                warn!(%code, "Skipping rate with malformed currency code");
                continue;
            }
            if !(rate.is_finite() && rate > 0.0) {
                warn!(%code, rate, "Skipping non-positive or non-finite rate");
                continue;
            }
            rates.insert(code, rate);
        }

        rates.insert(EURO.to_string(), 1.0);
        if rates.len() < 2 {
            return Err(FetchError::MissingData("currency rates"));
        }

        Ok(Self { date, rates })
    }

    /// Effective date of the rates as published upstream.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Supported currency codes, in alphabetical order.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

fn is_currency_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 10, 3).unwrap()
    }

    #[test]
    fn test_snapshot_always_contains_euro() {
        let snapshot = RateSnapshot::new(date(), vec![("USD".to_string(), 0.9764)]).unwrap();

        assert_eq!(snapshot.rate("EUR"), Some(1.0));
        assert_eq!(snapshot.rate("USD"), Some(0.9764));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.date(), date());
    }

    #[test]
    fn test_upstream_euro_rate_is_overridden() {
        let pairs = vec![("EUR".to_string(), 1.5), ("GBP".to_string(), 0.87)];
        let snapshot = RateSnapshot::new(date(), pairs).unwrap();

        assert_eq!(snapshot.rate("EUR"), Some(1.0));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let pairs = vec![
            ("USD".to_string(), 1.1),
            ("jpy".to_string(), 141.49),
            ("".to_string(), 2.0),
            ("X1Y".to_string(), 2.0),
            ("GBP".to_string(), 0.0),
            ("CHF".to_string(), -0.96),
            ("SEK".to_string(), f64::NAN),
            ("NOK".to_string(), f64::INFINITY),
        ];
        let snapshot = RateSnapshot::new(date(), pairs).unwrap();

        let codes: Vec<&str> = snapshot.currencies().collect();
        assert_eq!(codes, vec!["EUR", "JPY", "USD"]);
    }

    #[test]
    fn test_table_without_usable_rates_is_rejected() {
        let result = RateSnapshot::new(date(), vec![("GBP".to_string(), 0.0)]);
        assert!(matches!(result, Err(FetchError::MissingData(_))));

        let result = RateSnapshot::new(date(), Vec::new());
        assert!(result.is_err());
    }
}
