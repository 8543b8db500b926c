//! Shared, TTL-refreshed rate storage

pub mod rates;

pub use rates::RateStore;
