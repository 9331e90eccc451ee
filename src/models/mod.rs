//! Data models for the currency service.
//!
//! This module contains the data structures exchanged with the API:
//!
//! - `ConversionResult`: outcome of a conversion, also the `/history` post body
//! - `FavoritePair`: a user-saved currency pair shortcut
//! - `HistoryEntry`: a server-owned conversion record
//! - `RateInfo`: per-currency rate and 24h change
//! - Analytics types: `AnalyticsReport`, `ForecastResult`, `HistoricalComparison`

pub mod analytics;
pub mod conversion;
pub mod favorites;
pub mod history;
pub mod rates;

pub use analytics::{AnalyticsReport, CurrencyComparison, ForecastResult, HistoricalComparison, RatePoint};
pub use conversion::ConversionResult;
pub use favorites::FavoritePair;
pub use history::HistoryEntry;
pub use rates::{RateInfo, AVAILABLE_CURRENCIES};
