//! Application orchestration.
//!
//! `App` owns the session manager, API client, and refresh coordinator,
//! and implements the operations the command surface exposes: conversion,
//! favorites, history management, rates, and analytics. It is also where
//! 401 handling converges: synchronous calls route errors through
//! `handle_api_error`, background refreshes surface `SessionExpired`
//! through `tick`, and both end in `SessionManager::invalidate`.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::auth::{HttpAuthGateway, SessionManager, TokenStore};
use crate::config::Config;
use crate::models::{
    AnalyticsReport, ConversionResult, CurrencyComparison, FavoritePair, ForecastResult,
    HistoricalComparison, RateInfo,
};
use crate::sync::{RefreshCoordinator, RefreshUpdate};

/// Main application container wiring the core services together
pub struct App {
    pub config: Config,
    api: ApiClient,
    pub session: SessionManager,
    pub coordinator: RefreshCoordinator,
    pub last_conversion: Option<ConversionResult>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        let data_dir = Config::data_dir().context("Could not determine data directory")?;
        Self::with_config(config, data_dir)
    }

    /// Build the app against explicit config and session storage. The
    /// session is restored optimistically; a stale token is corrected by
    /// the first 401.
    pub fn with_config(config: Config, data_dir: PathBuf) -> Result<Self> {
        let api = ApiClient::new(config.resolved_base_url())?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let store = TokenStore::new(data_dir);
        let gateway = HttpAuthGateway::new(api.clone());
        let mut session = SessionManager::new(Box::new(gateway), store, events_tx);
        session.restore();

        let coordinator = RefreshCoordinator::new(events_rx);

        Ok(Self {
            config,
            api,
            session,
            coordinator,
            last_conversion: None,
        })
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    /// Pump session transitions into the coordinator and apply completed
    /// refreshes. Returns what changed so the caller can report it.
    pub fn tick(&mut self) -> Vec<RefreshUpdate> {
        self.coordinator.pump(&self.api);
        let updates = self.coordinator.poll();
        for update in &updates {
            if *update == RefreshUpdate::SessionExpired {
                self.session.invalidate();
            }
        }
        // An invalidation above emitted SignedOut; apply it right away so
        // the cleared caches are visible before the next prompt
        self.coordinator.pump(&self.api);
        updates
    }

    /// Centralized 401 handling for synchronous calls
    pub fn handle_api_error(&mut self, error: &ApiError) {
        if error.is_unauthorized() {
            self.session.invalidate();
            self.coordinator.pump(&self.api);
        }
    }

    fn authed_api(&self) -> Result<ApiClient, ApiError> {
        match self.session.token() {
            Some(token) => Ok(self.api.with_token(token)),
            None => Err(ApiError::NotLoggedIn),
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        self.session.login(email, password).await?;

        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        self.session.register(email, password).await
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.coordinator.pump(&self.api);
    }

    // =========================================================================
    // Converter
    // =========================================================================

    /// Convert an amount. Signed-in users get the conversion recorded to
    /// the server history, followed by a history refresh.
    pub async fn convert(
        &mut self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<ConversionResult, ApiError> {
        if !(amount > 0.0) {
            return Err(ApiError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let conversion = self.api.convert(amount, from_currency, to_currency).await?;
        self.last_conversion = Some(conversion.clone());

        let token = self.session.token().map(str::to_string);
        if let Some(token) = token {
            let authed = self.api.with_token(&token);
            match authed.save_history(&conversion).await {
                Ok(()) => self.coordinator.refresh_history(&authed),
                Err(e) => {
                    self.handle_api_error(&e);
                    return Err(e);
                }
            }
        }

        Ok(conversion)
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Toggle the favorite state of a pair, returning whether it is a
    /// favorite afterwards. Rejected locally while anonymous - no request
    /// is made.
    pub async fn toggle_favorite(
        &mut self,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<bool, ApiError> {
        let authed = self.authed_api()?;

        let result = if self.coordinator.is_favorite(from_currency, to_currency) {
            authed
                .remove_favorite(from_currency, to_currency)
                .await
                .map(|_| false)
        } else {
            authed
                .add_favorite(&FavoritePair::new(from_currency, to_currency))
                .await
                .map(|_| true)
        };

        match result {
            Ok(now_favorite) => {
                self.coordinator.refresh_favorites(&authed);
                Ok(now_favorite)
            }
            Err(e) => {
                self.handle_api_error(&e);
                Err(e)
            }
        }
    }

    pub async fn clear_favorites(&mut self) -> Result<(), ApiError> {
        let authed = self.authed_api()?;
        match authed.clear_favorites().await {
            Ok(()) => {
                self.coordinator.refresh_favorites(&authed);
                Ok(())
            }
            Err(e) => {
                self.handle_api_error(&e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    pub async fn delete_history_entry(&mut self, id: i64) -> Result<(), ApiError> {
        let authed = self.authed_api()?;
        match authed.delete_history(id).await {
            Ok(()) => {
                self.coordinator.refresh_history(&authed);
                Ok(())
            }
            Err(e) => {
                self.handle_api_error(&e);
                Err(e)
            }
        }
    }

    pub async fn clear_history(&mut self) -> Result<(), ApiError> {
        let authed = self.authed_api()?;
        match authed.clear_history().await {
            Ok(()) => {
                self.coordinator.refresh_history(&authed);
                Ok(())
            }
            Err(e) => {
                self.handle_api_error(&e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Rates and analytics (no session required)
    // =========================================================================

    pub async fn rates(&self, base: &str) -> Result<HashMap<String, RateInfo>, ApiError> {
        self.api.fetch_rates(base).await
    }

    pub async fn latest_rates(&self, base: &str) -> Result<HashMap<String, RateInfo>, ApiError> {
        self.api.fetch_latest_rates(base).await
    }

    pub async fn analytics_report(
        &self,
        from_currency: &str,
        to_currency: &str,
        days: u32,
    ) -> Result<AnalyticsReport, ApiError> {
        self.api
            .analytics_report(from_currency, to_currency, days)
            .await
    }

    pub async fn analytics_comparison(&self) -> Result<Vec<CurrencyComparison>, ApiError> {
        self.api.analytics_comparison().await
    }

    pub async fn forecast(
        &self,
        from_currency: &str,
        to_currency: &str,
        days: u32,
    ) -> Result<ForecastResult, ApiError> {
        self.api.forecast(from_currency, to_currency, days).await
    }

    pub async fn historical_compare(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<HistoricalComparison, ApiError> {
        self.api
            .historical_compare(amount, from_currency, to_currency, date_from, date_to)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_app(data_dir: PathBuf) -> App {
        let config = Config {
            // Unroutable: any request that escapes a local guard fails as
            // a network error rather than silently succeeding
            base_url: Some("http://127.0.0.1:1".to_string()),
            last_email: None,
        };
        App::with_config(config, data_dir).expect("app")
    }

    #[tokio::test]
    async fn test_toggle_favorite_rejected_locally_while_anonymous() {
        let dir = tempdir().expect("tempdir");
        let mut app = test_app(dir.path().to_path_buf());

        let err = app.toggle_favorite("USD", "EUR").await.expect_err("must reject");
        assert!(matches!(err, ApiError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_convert_rejects_non_positive_amount() {
        let dir = tempdir().expect("tempdir");
        let mut app = test_app(dir.path().to_path_buf());

        let err = app.convert(0.0, "USD", "EUR").await.expect_err("must reject");
        assert!(matches!(err, ApiError::Validation(_)));
        let err = app.convert(-5.0, "USD", "EUR").await.expect_err("must reject");
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_history_operations_rejected_while_anonymous() {
        let dir = tempdir().expect("tempdir");
        let mut app = test_app(dir.path().to_path_buf());

        assert!(matches!(
            app.delete_history_entry(1).await,
            Err(ApiError::NotLoggedIn)
        ));
        assert!(matches!(app.clear_history().await, Err(ApiError::NotLoggedIn)));
        assert!(matches!(app.clear_favorites().await, Err(ApiError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_restore_is_optimistic() {
        let dir = tempdir().expect("tempdir");
        TokenStore::new(dir.path().to_path_buf())
            .save("T", "a@b.com")
            .expect("seed store");

        let app = test_app(dir.path().to_path_buf());
        assert!(app.session.is_authenticated());
        assert_eq!(app.session.email(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_unauthorized_error_signs_out_and_clears_store() {
        let dir = tempdir().expect("tempdir");
        TokenStore::new(dir.path().to_path_buf())
            .save("T", "a@b.com")
            .expect("seed store");

        let mut app = test_app(dir.path().to_path_buf());
        assert!(app.session.is_authenticated());

        app.handle_api_error(&ApiError::Unauthorized);

        assert!(!app.session.is_authenticated());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
        assert!(app.coordinator.history().is_empty());
        assert!(app.coordinator.favorites().is_empty());
    }

    /// Scripted conversion service: answers the endpoints the converter
    /// flow touches and records every request head it sees
    async fn serve_api(listener: TcpListener, requests: Arc<Mutex<Vec<String>>>) {
        while let Ok((mut socket, _)) = listener.accept().await {
            let requests = requests.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]).to_string();
                let request_line = head.lines().next().unwrap_or("").to_string();
                requests.lock().expect("requests lock").push(head);

                let body = if request_line.starts_with("POST /convert") {
                    r#"{"result": 92.5, "rate": 0.925, "source": "test"}"#
                } else if request_line.starts_with("GET /history") {
                    r#"[{"id": 1, "amount": 100.0, "from_currency": "USD", "to_currency": "EUR", "result": 92.5, "rate": 0.925, "timestamp": "2025-06-01T12:30:00Z"}]"#
                } else if request_line.starts_with("GET /favorites") {
                    "[]"
                } else {
                    "{}"
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    }

    #[tokio::test]
    async fn test_convert_while_authenticated_posts_history_and_refreshes() {
        let dir = tempdir().expect("tempdir");
        TokenStore::new(dir.path().to_path_buf())
            .save("T", "a@b.com")
            .expect("seed store");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(serve_api(listener, requests.clone()));

        let config = Config {
            base_url: Some(format!("http://{}", addr)),
            last_email: None,
        };
        let mut app = App::with_config(config, dir.path().to_path_buf()).expect("app");
        app.tick();

        let conversion = app.convert(100.0, "USD", "EUR").await.expect("convert");
        assert_eq!(conversion.result, 92.5);
        assert_eq!(conversion.from_currency, "USD");
        assert_eq!(conversion.to_currency, "EUR");

        // Sign-in issued the first history fetch; the post-conversion
        // refresh is the second
        let history_gets = |requests: &Mutex<Vec<String>>| {
            requests
                .lock()
                .expect("requests lock")
                .iter()
                .filter(|head| head.starts_with("GET /history"))
                .count()
        };
        let mut remaining = 500;
        while (history_gets(&requests) < 2 || app.coordinator.history().is_empty()) && remaining > 0
        {
            app.tick();
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining -= 1;
        }
        assert!(history_gets(&requests) >= 2);
        assert_eq!(app.coordinator.history().len(), 1);

        let log = requests.lock().expect("requests lock");
        let convert_at = log
            .iter()
            .position(|head| head.starts_with("POST /convert"))
            .expect("convert request");
        let history_post_at = log
            .iter()
            .position(|head| head.starts_with("POST /history"))
            .expect("history post");
        assert!(convert_at < history_post_at);

        // Every authenticated request carries the bearer token
        assert!(log[history_post_at].contains("Bearer T"));
        for head in log.iter().filter(|h| h.starts_with("GET /history") || h.starts_with("GET /favorites")) {
            assert!(head.contains("Bearer T"));
        }
    }

    /// Answer every request with a bare 401
    async fn serve_unauthorized(listener: TcpListener) {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            });
        }
    }

    #[tokio::test]
    async fn test_background_401_signs_out_through_tick() {
        let dir = tempdir().expect("tempdir");
        TokenStore::new(dir.path().to_path_buf())
            .save("stale", "a@b.com")
            .expect("seed store");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(serve_unauthorized(listener));

        let config = Config {
            base_url: Some(format!("http://{}", addr)),
            last_email: None,
        };
        let mut app = App::with_config(config, dir.path().to_path_buf()).expect("app");
        assert!(app.session.is_authenticated());

        // Restore queued SignedIn; ticking pumps it, which spawns the
        // history/favorites fetches that come back 401
        let mut remaining = 500;
        while app.session.is_authenticated() && remaining > 0 {
            app.tick();
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining -= 1;
        }

        assert!(!app.session.is_authenticated());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
        assert!(app.coordinator.history().is_empty());
        assert!(app.coordinator.favorites().is_empty());
    }

    #[tokio::test]
    async fn test_non_auth_errors_leave_session_alone() {
        let dir = tempdir().expect("tempdir");
        TokenStore::new(dir.path().to_path_buf())
            .save("T", "a@b.com")
            .expect("seed store");

        let mut app = test_app(dir.path().to_path_buf());
        app.handle_api_error(&ApiError::Server("boom".to_string()));
        assert!(app.session.is_authenticated());
    }
}
