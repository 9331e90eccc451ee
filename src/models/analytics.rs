use serde::{Deserialize, Serialize};

/// One point of the rate series in an analytics report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatePoint {
    pub date: String,
    pub rate: f64,
}

/// Report for a currency pair over a period, from `GET /analytics/report`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsReport {
    #[serde(default)]
    pub history: Vec<RatePoint>,
    pub change_percent: f64,
    pub volatility: f64,
    pub recommendation: String,
}

impl AnalyticsReport {
    pub fn volatility_display(&self) -> &'static str {
        if self.volatility < 1.0 {
            "low"
        } else if self.volatility < 2.5 {
            "medium"
        } else {
            "high"
        }
    }
}

/// Row of the popular-pairs comparison table, from `GET /analytics/comparison`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyComparison {
    pub currency: String,
    pub change: String,
    pub trend: String,
    pub recommendation: String,
}

/// Forecast for a pair, from `GET /forecast/calculate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastResult {
    pub current_rate: f64,
    pub forecast_rate: f64,
    pub change_percent: f64,
    pub trend: String,
    pub confidence: f64,
    pub recommendation: String,
}

impl ForecastResult {
    pub fn trend_is_up(&self) -> bool {
        self.trend == "up"
    }
}

/// What an amount converted then vs now, from `GET /historical/compare`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalComparison {
    pub old_rate: f64,
    pub old_result: f64,
    pub new_rate: f64,
    pub new_result: f64,
    pub difference: f64,
    pub percent_change: f64,
}
