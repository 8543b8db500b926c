//! Core domain types and abstractions

pub mod config;
pub mod error;
pub mod fetcher;
pub mod log;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use error::{ConversionError, FetchError};
pub use fetcher::RateFetcher;
pub use snapshot::RateSnapshot;
