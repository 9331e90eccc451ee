use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-owned conversion record. The id is assigned by the server;
/// entries are created by posting a `ConversionResult` to `/history`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
    pub result: f64,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Table row for display: date, operation, rate
    pub fn display_row(&self) -> String {
        format!(
            "{}  {} {} → {:.2} {}  (1 {} = {:.4} {})",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.amount,
            self.from_currency,
            self.result,
            self.to_currency,
            self.from_currency,
            self.rate,
            self.to_currency,
        )
    }
}
