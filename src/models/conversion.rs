use serde::{Deserialize, Serialize};

/// A completed conversion. Produced from a `/convert` response plus the
/// request that triggered it; posted verbatim to `/history` when the user
/// is signed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionResult {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
    pub result: f64,
    pub rate: f64,
    #[serde(default)]
    pub source: Option<String>,
}

impl ConversionResult {
    /// One-line summary for display, e.g. `100 USD = 92.50 EUR (rate 0.9250)`
    pub fn summary(&self) -> String {
        format!(
            "{} {} = {:.2} {} (rate {:.4})",
            self.amount, self.from_currency, self.result, self.to_currency, self.rate
        )
    }

    pub fn source_display(&self) -> &str {
        self.source.as_deref().unwrap_or("Server")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConversionResult {
        ConversionResult {
            amount: 100.0,
            from_currency: "USD".to_string(),
            to_currency: "EUR".to_string(),
            result: 92.5,
            rate: 0.925,
            source: None,
        }
    }

    #[test]
    fn test_summary() {
        assert_eq!(sample().summary(), "100 USD = 92.50 EUR (rate 0.9250)");
    }

    #[test]
    fn test_source_display_fallback() {
        assert_eq!(sample().source_display(), "Server");
        let mut with_source = sample();
        with_source.source = Some("ECB".to_string());
        assert_eq!(with_source.source_display(), "ECB");
    }

    #[test]
    fn test_history_post_body_shape() {
        let body = serde_json::to_value(sample()).expect("serialize conversion");
        assert_eq!(body["amount"], 100.0);
        assert_eq!(body["from_currency"], "USD");
        assert_eq!(body["to_currency"], "EUR");
        assert_eq!(body["result"], 92.5);
        assert_eq!(body["rate"], 0.925);
    }
}
