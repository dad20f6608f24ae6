//! # sr-market-data
//!
//! Retrieves the last traded price and the published trading rules for a
//! market from an exchange's public REST listings. The order pipeline depends
//! only on the [`MarketDataFetcher`] trait.

pub mod fetcher;
pub mod rest;
pub mod types;

pub use fetcher::{MarketDataError, MarketDataFetcher, UnconfiguredMarketData};
pub use rest::RestMarketData;
