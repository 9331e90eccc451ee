use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::ApiError;

use super::{AuthGateway, Credentials, TokenStore};

/// The client-side record of an authenticated user. Absent = anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub email: String,
}

/// Session transitions, broadcast so dependent components (the refresh
/// coordinator) can react without the manager knowing about them.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
}

/// Owner of the session state machine.
///
/// Two states: anonymous (`session` is `None`) and authenticated. The
/// manager is the only writer of the token store, and every transition
/// emits exactly one event. Server-side invalidation (a 401 anywhere)
/// funnels into [`SessionManager::invalidate`].
pub struct SessionManager {
    gateway: Box<dyn AuthGateway>,
    store: TokenStore,
    session: Option<Session>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        gateway: Box<dyn AuthGateway>,
        store: TokenStore,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            gateway,
            store,
            session: None,
            events,
        }
    }

    /// Restore a persisted session at startup without contacting the
    /// server. A stale token self-heals on the first authenticated call,
    /// which comes back 401 and invalidates the session.
    pub fn restore(&mut self) -> bool {
        match self.store.load() {
            Some(session) => {
                info!(email = %session.email, "Restored session from disk");
                self.session = Some(session.clone());
                self.emit(SessionEvent::SignedIn(session));
                true
            }
            None => {
                debug!("No persisted session, starting anonymous");
                false
            }
        }
    }

    /// Authenticate and transition to the authenticated state.
    ///
    /// On failure the state and token store are untouched and the error
    /// surfaces to the caller.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let credentials = Credentials::new(email, password);
        let grant = self.gateway.login(&credentials).await?;

        let session = Session {
            token: grant.access_token,
            email: email.to_string(),
        };

        // Persistence is redundancy for restart survival; a write failure
        // must not fail an otherwise successful login.
        if let Err(e) = self.store.save(&session.token, &session.email) {
            warn!(error = %e, "Failed to persist session");
        }

        info!(email = %session.email, "Signed in");
        self.session = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session));
        Ok(())
    }

    /// Create an account. Leaves the session state untouched; the caller
    /// logs in separately afterwards.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let credentials = Credentials::new(email, password);
        self.gateway.register(&credentials).await
    }

    /// Drop the session and its persisted copy. A no-op when already
    /// anonymous: no event, no store write.
    pub fn logout(&mut self) {
        if self.session.is_none() {
            debug!("Logout while anonymous, nothing to do");
            return;
        }
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        info!("Signed out");
        self.session = None;
        self.emit(SessionEvent::SignedOut);
    }

    /// Centralized handler for server-reported invalidation. Every call
    /// site that observes a 401 on an authenticated request routes here.
    pub fn invalidate(&mut self) {
        if self.session.is_some() {
            info!("Server rejected the session token, signing out");
        }
        self.logout();
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.email.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No session event subscriber");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenGrant;
    use async_trait::async_trait;
    use tempfile::{tempdir, TempDir};

    struct FakeGateway {
        fail: bool,
    }

    impl FakeGateway {
        fn accepting() -> Self {
            Self { fail: false }
        }

        fn rejecting() -> Self {
            Self { fail: true }
        }
    }

    #[async_trait]
    impl AuthGateway for FakeGateway {
        async fn login(&self, _credentials: &Credentials) -> Result<TokenGrant, ApiError> {
            if self.fail {
                Err(ApiError::InvalidCredentials("Invalid email or password".to_string()))
            } else {
                Ok(TokenGrant {
                    access_token: "T".to_string(),
                    token_type: "bearer".to_string(),
                })
            }
        }

        async fn register(&self, _credentials: &Credentials) -> Result<(), ApiError> {
            if self.fail {
                Err(ApiError::RegistrationFailed("Email already registered".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn manager(
        dir: &TempDir,
        gateway: FakeGateway,
    ) -> (SessionManager, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = TokenStore::new(dir.path().to_path_buf());
        (SessionManager::new(Box::new(gateway), store, tx), rx)
    }

    #[tokio::test]
    async fn test_login_success_transitions_and_persists() {
        let dir = tempdir().expect("tempdir");
        let (mut mgr, mut rx) = manager(&dir, FakeGateway::accepting());

        mgr.login("a@b.com", "secret1").await.expect("login");

        assert!(mgr.is_authenticated());
        assert_eq!(mgr.token(), Some("T"));
        assert_eq!(mgr.email(), Some("a@b.com"));

        let stored = TokenStore::new(dir.path().to_path_buf())
            .load()
            .expect("persisted session");
        assert_eq!(stored.token, "T");
        assert_eq!(stored.email, "a@b.com");

        // Exactly one transition event
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::SignedIn(s)) if s.token == "T"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_login_failure_leaves_anonymous_and_store_untouched() {
        let dir = tempdir().expect("tempdir");
        let (mut mgr, mut rx) = manager(&dir, FakeGateway::rejecting());

        let err = mgr.login("a@b.com", "wrong").await.expect_err("login must fail");
        assert!(matches!(err, ApiError::InvalidCredentials(_)));

        assert!(!mgr.is_authenticated());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_clears_store_and_emits_once() {
        let dir = tempdir().expect("tempdir");
        let (mut mgr, mut rx) = manager(&dir, FakeGateway::accepting());

        mgr.login("a@b.com", "secret1").await.expect("login");
        let _ = rx.try_recv();

        mgr.logout();
        assert!(!mgr.is_authenticated());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::SignedOut)));

        // Already anonymous: no-op, no second event
        mgr.logout();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_leaves_state_anonymous() {
        let dir = tempdir().expect("tempdir");
        let (mgr, mut rx) = manager(&dir, FakeGateway::accepting());

        mgr.register("a@b.com", "secret1").await.expect("register");

        assert!(!mgr.is_authenticated());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_failure_propagates() {
        let dir = tempdir().expect("tempdir");
        let (mgr, _rx) = manager(&dir, FakeGateway::rejecting());

        let err = mgr.register("a@b.com", "secret1").await.expect_err("must fail");
        assert!(matches!(err, ApiError::RegistrationFailed(_)));
    }

    #[tokio::test]
    async fn test_restore_from_persisted_session() {
        let dir = tempdir().expect("tempdir");
        TokenStore::new(dir.path().to_path_buf())
            .save("T", "a@b.com")
            .expect("seed store");

        let (mut mgr, mut rx) = manager(&dir, FakeGateway::accepting());
        assert!(mgr.restore());
        assert!(mgr.is_authenticated());
        assert_eq!(mgr.email(), Some("a@b.com"));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::SignedIn(_))));
    }

    #[tokio::test]
    async fn test_restore_with_empty_store() {
        let dir = tempdir().expect("tempdir");
        let (mut mgr, mut rx) = manager(&dir, FakeGateway::accepting());
        assert!(!mgr.restore());
        assert!(!mgr.is_authenticated());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalidate_signs_out_and_clears_store() {
        let dir = tempdir().expect("tempdir");
        let (mut mgr, mut rx) = manager(&dir, FakeGateway::accepting());

        mgr.login("a@b.com", "secret1").await.expect("login");
        let _ = rx.try_recv();

        mgr.invalidate();
        assert!(!mgr.is_authenticated());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::SignedOut)));
    }
}
