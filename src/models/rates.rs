use serde::{Deserialize, Serialize};

/// Currencies offered by the converter UI. The server accepts any code it
/// has rates for; this list is what the command surface suggests.
pub const AVAILABLE_CURRENCIES: &[&str] = &["USD", "EUR", "RUB", "GBP", "JPY", "CNY"];

/// Rate for one currency against the requested base, with its 24h change
/// in percent. The value type of the `rates` map in `/rates/{base}` and
/// `/rates/latest/{base}` responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateInfo {
    pub rate: f64,
    #[serde(default)]
    pub change: f64,
}

impl RateInfo {
    /// `+0.42%` / `-1.10%` formatting used in rate tables
    pub fn change_display(&self) -> String {
        if self.change > 0.0 {
            format!("+{:.2}%", self.change)
        } else {
            format!("{:.2}%", self.change)
        }
    }

    pub fn trend_is_up(&self) -> bool {
        self.change >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_display_sign() {
        assert_eq!(RateInfo { rate: 1.0, change: 0.42 }.change_display(), "+0.42%");
        assert_eq!(RateInfo { rate: 1.0, change: -1.1 }.change_display(), "-1.10%");
        assert_eq!(RateInfo { rate: 1.0, change: 0.0 }.change_display(), "0.00%");
    }

    #[test]
    fn test_change_defaults_to_zero() {
        let info: RateInfo = serde_json::from_str(r#"{"rate": 92.5}"#).expect("parse rate");
        assert_eq!(info.rate, 92.5);
        assert_eq!(info.change, 0.0);
        assert!(info.trend_is_up());
    }
}
