use serde::{Deserialize, Serialize};

/// A user-saved currency pair shortcut. Server-owned per account; the
/// local copy is a cached snapshot managed by the refresh coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoritePair {
    pub from_currency: String,
    pub to_currency: String,
    pub label: String,
}

impl FavoritePair {
    /// Create a pair with the default `FROM → TO` label
    pub fn new(from_currency: &str, to_currency: &str) -> Self {
        Self {
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
            label: format!("{} → {}", from_currency, to_currency),
        }
    }

    pub fn matches(&self, from_currency: &str, to_currency: &str) -> bool {
        self.from_currency == from_currency && self.to_currency == to_currency
    }
}
