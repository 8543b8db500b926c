pub mod ecb;

pub use ecb::EcbRateFetcher;
