//! Terminal-state detection for game sessions.

use crate::types::GameSession;
use std::sync::atomic::{AtomicBool, Ordering};

/// Watches session updates for the transition into the ended state and
/// reports it exactly once.
///
/// The detector keeps its own latch rather than consulting the state store:
/// the bulk snapshot load and a live update can race, so the store's view of
/// `ended_at` is not a reliable edge detector.
#[derive(Debug, Default)]
pub struct GameOverDetector {
    ended: AtomicBool,
}

impl GameOverDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect a session update. Returns `true` exactly once: on the first
    /// observed session carrying a set `ended_at`. Later ended sessions still
    /// update state elsewhere but never re-fire.
    pub fn observe(&self, session: &GameSession) -> bool {
        if session.ended_at.is_none() {
            return false;
        }
        !self.ended.swap(true, Ordering::SeqCst)
    }

    /// Whether the terminal state has been observed.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}
