//! Authentication: session state, token persistence, and the login gateway.
//!
//! This module provides:
//! - `SessionManager`: the Anonymous/Authenticated state machine owning the
//!   current `Session`, with centralized 401 invalidation
//! - `TokenStore`: file-backed persistence of token + email across restarts
//! - `AuthGateway`: the login/register seam, implemented over HTTP by
//!   `HttpAuthGateway` and by fakes in tests

pub mod gateway;
pub mod session;
pub mod store;

pub use gateway::{AuthGateway, Credentials, HttpAuthGateway, TokenGrant};
pub use session::{Session, SessionEvent, SessionManager};
pub use store::TokenStore;
