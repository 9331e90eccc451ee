//! Synchronization of server-owned collections.
//!
//! The refresh coordinator re-fetches history and favorites after
//! state-changing events (sign-in, mutations) and drops the cached
//! snapshots on sign-out. Fetches are fire-and-forget; per-collection
//! sequence numbers keep late responses from overwriting newer state.

pub mod coordinator;

pub use coordinator::{RefreshCoordinator, RefreshUpdate};
