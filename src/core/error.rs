//! Error types shared by the rate store and the conversion service

use thiserror::Error;

/// Failure to retrieve or understand the upstream rate table.
///
/// These never reach API callers; the rate store logs them and keeps serving
/// the previous snapshot.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to parse rate table: {0}")]
    Parse(String),
    #[error("Rate table is missing {0}")]
    MissingData(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Unknown code, empty input, or no rates loaded yet.
    #[error("Currency rate invalid, please check the currency code is supported")]
    InvalidCurrency,
}
