use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionEvent;
use crate::models::{FavoritePair, HistoryEntry};

/// Result of one spawned fetch, tagged with the sequence number it was
/// issued under so superseded responses can be recognized on arrival.
enum FetchOutcome {
    History {
        seq: u64,
        result: Result<Vec<HistoryEntry>, ApiError>,
    },
    Favorites {
        seq: u64,
        result: Result<Vec<FavoritePair>, ApiError>,
    },
}

/// Changes surfaced by [`RefreshCoordinator::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshUpdate {
    HistoryChanged,
    FavoritesChanged,
    /// A background refresh came back 401: the session must be invalidated
    SessionExpired,
}

/// Keeps the local history/favorites snapshots in step with the session.
///
/// Session transitions arrive on a channel fed by the session manager.
/// Sign-in clears both snapshots and fetches fresh copies; sign-out clears
/// locally without a network call. Mutations re-fetch only the affected
/// collection. Each collection carries a monotonic sequence number of the
/// latest issued fetch; a response is applied only if its sequence is
/// still the latest, so an in-flight request that was superseded cannot
/// overwrite newer state.
pub struct RefreshCoordinator {
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    history_seq: u64,
    favorites_seq: u64,
    history: Vec<HistoryEntry>,
    favorites: Vec<FavoritePair>,
}

impl RefreshCoordinator {
    pub fn new(session_rx: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            session_rx,
            outcome_tx,
            outcome_rx,
            history_seq: 0,
            favorites_seq: 0,
            history: Vec::new(),
            favorites: Vec::new(),
        }
    }

    /// Cached history snapshot. Empty while anonymous.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Cached favorites snapshot. Empty while anonymous.
    pub fn favorites(&self) -> &[FavoritePair] {
        &self.favorites
    }

    pub fn is_favorite(&self, from_currency: &str, to_currency: &str) -> bool {
        self.favorites
            .iter()
            .any(|f| f.matches(from_currency, to_currency))
    }

    /// Drain pending session events and react to each transition
    pub fn pump(&mut self, api: &ApiClient) {
        while let Ok(event) = self.session_rx.try_recv() {
            match event {
                SessionEvent::SignedIn(session) => {
                    debug!(email = %session.email, "Session started, loading collections");
                    self.clear_snapshots();
                    let authed = api.with_token(&session.token);
                    self.refresh_history(&authed);
                    self.refresh_favorites(&authed);
                }
                SessionEvent::SignedOut => {
                    debug!("Session ended, dropping cached collections");
                    self.clear_snapshots();
                    // Invalidate anything still in flight
                    self.history_seq += 1;
                    self.favorites_seq += 1;
                }
            }
        }
    }

    /// Issue a history re-fetch. Fire-and-forget: the snapshot updates on
    /// a later [`poll`](Self::poll) when the response arrives, if it has
    /// not been superseded by then.
    pub fn refresh_history(&mut self, api: &ApiClient) {
        self.history_seq += 1;
        let seq = self.history_seq;
        let api = api.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_history().await;
            if tx.send(FetchOutcome::History { seq, result }).is_err() {
                debug!("Refresh outcome receiver dropped");
            }
        });
    }

    /// Issue a favorites re-fetch, same contract as [`refresh_history`](Self::refresh_history)
    pub fn refresh_favorites(&mut self, api: &ApiClient) {
        self.favorites_seq += 1;
        let seq = self.favorites_seq;
        let api = api.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_favorites().await;
            if tx.send(FetchOutcome::Favorites { seq, result }).is_err() {
                debug!("Refresh outcome receiver dropped");
            }
        });
    }

    /// Apply completed fetches and report what changed
    pub fn poll(&mut self) -> Vec<RefreshUpdate> {
        let mut updates = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if let Some(update) = self.apply(outcome) {
                updates.push(update);
            }
        }
        updates
    }

    fn clear_snapshots(&mut self) {
        self.history.clear();
        self.favorites.clear();
    }

    fn apply(&mut self, outcome: FetchOutcome) -> Option<RefreshUpdate> {
        match outcome {
            FetchOutcome::History { seq, result } => {
                if seq != self.history_seq {
                    debug!(seq, latest = self.history_seq, "Discarding superseded history refresh");
                    return None;
                }
                match result {
                    Ok(entries) => {
                        debug!(count = entries.len(), "History snapshot updated");
                        self.history = entries;
                        Some(RefreshUpdate::HistoryChanged)
                    }
                    Err(e) if e.is_unauthorized() => Some(RefreshUpdate::SessionExpired),
                    Err(e) => {
                        // Background failure: keep showing the previous snapshot
                        warn!(error = %e, "History refresh failed");
                        None
                    }
                }
            }
            FetchOutcome::Favorites { seq, result } => {
                if seq != self.favorites_seq {
                    debug!(seq, latest = self.favorites_seq, "Discarding superseded favorites refresh");
                    return None;
                }
                match result {
                    Ok(pairs) => {
                        debug!(count = pairs.len(), "Favorites snapshot updated");
                        self.favorites = pairs;
                        Some(RefreshUpdate::FavoritesChanged)
                    }
                    Err(e) if e.is_unauthorized() => Some(RefreshUpdate::SessionExpired),
                    Err(e) => {
                        warn!(error = %e, "Favorites refresh failed");
                        None
                    }
                }
            }
        }
    }
}
