//! Upstream rate retrieval abstraction

use async_trait::async_trait;

use super::{FetchError, RateSnapshot};

#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Fetches the latest reference rate table.
    ///
    /// Implementations perform a single attempt and must not touch any shared
    /// state; retry policy belongs to the caller.
    async fn fetch_rates(&self) -> Result<RateSnapshot, FetchError>;
}
