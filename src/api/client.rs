//! API client for the currency-conversion service.
//!
//! One client instance serves both anonymous and authenticated calls;
//! `with_token` derives an authenticated clone sharing the connection
//! pool. Endpoints that require a session check for a token locally and
//! fail with `ApiError::NotLoggedIn` before any request goes out.

use std::collections::HashMap;

use chrono::NaiveDate;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use crate::auth::TokenGrant;
use crate::models::{
    AnalyticsReport, ConversionResult, CurrencyComparison, FavoritePair, ForecastResult,
    HistoricalComparison, HistoryEntry, RateInfo,
};

use super::ApiError;

/// Default base URL of the conversion service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

// ============================================================================
// Response schemas
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    result: f64,
    rate: f64,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, RateInfo>,
}

#[derive(Debug, Deserialize)]
struct FavoriteItem {
    from_currency: String,
    to_currency: String,
    #[serde(default)]
    label: Option<String>,
}

impl FavoriteItem {
    fn into_pair(self) -> FavoritePair {
        match self.label {
            Some(label) if !label.is_empty() => FavoritePair {
                from_currency: self.from_currency,
                to_currency: self.to_currency,
                label,
            },
            _ => FavoritePair::new(&self.from_currency, &self.to_currency),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// API client for the conversion service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL.
    /// No request timeout is set; the transport default applies.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Create a client with the given token, sharing the connection pool
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reject a protected call locally when no session token is set
    fn require_token(&self) -> Result<(), ApiError> {
        if self.token.is_none() {
            return Err(ApiError::NotLoggedIn);
        }
        Ok(())
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if the response is successful, mapping the status and body to
    /// an `ApiError` if not
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    // ===== Authentication =====

    /// Exchange credentials for a token. The endpoint takes the OAuth2
    /// password-grant form shape: `username` carries the email.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, ApiError> {
        let response = self
            .client
            .post(self.url("/token"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = ApiError::detail_from_body(&body)
                .unwrap_or_else(|| "Invalid email or password".to_string());
            return Err(ApiError::InvalidCredentials(message));
        }

        let grant: TokenResponse = Self::parse(response, "token response").await?;
        Ok(TokenGrant {
            access_token: grant.access_token,
            token_type: grant.token_type,
        })
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/register"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = ApiError::detail_from_body(&body)
                .unwrap_or_else(|| "Registration failed".to_string());
            return Err(ApiError::RegistrationFailed(message));
        }
        Ok(())
    }

    // ===== Conversion and rates =====

    /// Convert an amount. The response carries result/rate/source; the
    /// request side of the record is filled in from the arguments.
    pub async fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<ConversionResult, ApiError> {
        let response = self
            .client
            .post(self.url("/convert"))
            .json(&serde_json::json!({
                "amount": amount,
                "from_currency": from_currency,
                "to_currency": to_currency,
            }))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let data: ConvertResponse = Self::parse(response, "convert response").await?;

        Ok(ConversionResult {
            amount,
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
            result: data.result,
            rate: data.rate,
            source: data.source,
        })
    }

    pub async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, RateInfo>, ApiError> {
        self.fetch_rates_at(&format!("/rates/{}", base)).await
    }

    /// Latest rates with 24h change, used for the rates overview
    pub async fn fetch_latest_rates(
        &self,
        base: &str,
    ) -> Result<HashMap<String, RateInfo>, ApiError> {
        self.fetch_rates_at(&format!("/rates/latest/{}", base)).await
    }

    async fn fetch_rates_at(&self, path: &str) -> Result<HashMap<String, RateInfo>, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = Self::check_response(response).await?;
        let data: RatesResponse = Self::parse(response, "rates response").await?;
        debug!(count = data.rates.len(), path, "Rates fetched");
        Ok(data.rates)
    }

    // ===== Favorites (authenticated) =====

    pub async fn fetch_favorites(&self) -> Result<Vec<FavoritePair>, ApiError> {
        self.require_token()?;
        let response = self
            .client
            .get(self.url("/favorites"))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let items: Vec<FavoriteItem> = Self::parse(response, "favorites response").await?;
        Ok(items.into_iter().map(FavoriteItem::into_pair).collect())
    }

    pub async fn add_favorite(&self, pair: &FavoritePair) -> Result<(), ApiError> {
        self.require_token()?;
        let response = self
            .client
            .post(self.url("/favorites"))
            .headers(self.auth_headers()?)
            .json(pair)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn remove_favorite(
        &self,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<(), ApiError> {
        self.require_token()?;
        let response = self
            .client
            .delete(self.url(&format!("/favorites/{}/{}", from_currency, to_currency)))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn clear_favorites(&self) -> Result<(), ApiError> {
        self.require_token()?;
        let response = self
            .client
            .delete(self.url("/favorites"))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== History (authenticated) =====

    pub async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        self.require_token()?;
        let response = self
            .client
            .get(self.url("/history"))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, "history response").await
    }

    /// Record a completed conversion. The body is the conversion itself;
    /// the server assigns id and timestamp.
    pub async fn save_history(&self, conversion: &ConversionResult) -> Result<(), ApiError> {
        self.require_token()?;
        let response = self
            .client
            .post(self.url("/history"))
            .headers(self.auth_headers()?)
            .json(conversion)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn delete_history(&self, id: i64) -> Result<(), ApiError> {
        self.require_token()?;
        let response = self
            .client
            .delete(self.url(&format!("/history/{}", id)))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn clear_history(&self) -> Result<(), ApiError> {
        self.require_token()?;
        let response = self
            .client
            .delete(self.url("/history"))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Analytics (read-only, unauthenticated) =====

    pub async fn analytics_report(
        &self,
        from_currency: &str,
        to_currency: &str,
        days: u32,
    ) -> Result<AnalyticsReport, ApiError> {
        let response = self
            .client
            .get(self.url("/analytics/report"))
            .query(&[
                ("from_curr", from_currency),
                ("to_curr", to_currency),
                ("days", &days.to_string()),
            ])
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, "analytics report").await
    }

    pub async fn analytics_comparison(&self) -> Result<Vec<CurrencyComparison>, ApiError> {
        let response = self
            .client
            .get(self.url("/analytics/comparison"))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, "analytics comparison").await
    }

    pub async fn forecast(
        &self,
        from_currency: &str,
        to_currency: &str,
        days: u32,
    ) -> Result<ForecastResult, ApiError> {
        let response = self
            .client
            .get(self.url("/forecast/calculate"))
            .query(&[
                ("from_curr", from_currency),
                ("to_curr", to_currency),
                ("days", &days.to_string()),
            ])
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, "forecast").await
    }

    pub async fn historical_compare(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<HistoricalComparison, ApiError> {
        let response = self
            .client
            .get(self.url("/historical/compare"))
            .query(&[
                ("amount", amount.to_string()),
                ("from_curr", from_currency.to_string()),
                ("to_curr", to_currency.to_string()),
                ("date_from", date_from.format("%Y-%m-%d").to_string()),
                ("date_to", date_to.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, "historical comparison").await
    }
}
