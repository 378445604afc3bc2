//! Thread-safe projection of per-player state plus the session record.

use crate::types::{GameSession, PlayerId, PlayerState};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Keyed projection of player states and the single session record.
///
/// The ground truth the rest of the system reads. Mutation is last-writer-wins
/// by arrival order: two concurrent updates for the same player resolve to
/// whichever is applied last, regardless of which was generated later on the
/// server. No update is rejected and there is no staleness detection.
///
/// Player entries are independent per key; the session record sits in its own
/// cell so snapshot load and the first live session update cannot lose each
/// other's write.
#[derive(Default)]
pub struct StateStore {
    players: RwLock<HashMap<PlayerId, PlayerState>>,
    session: RwLock<Option<GameSession>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace one player's state.
    pub fn upsert_player(&self, state: PlayerState) {
        self.players.write().insert(state.player_id.clone(), state);
    }

    /// Remove a player, returning the state that was held.
    pub fn remove_player(&self, player_id: &PlayerId) -> Option<PlayerState> {
        self.players.write().remove(player_id)
    }

    /// Replace the session record.
    pub fn set_session(&self, session: GameSession) {
        *self.session.write() = Some(session);
    }

    /// Current session projection, or `None` if never connected.
    pub fn session(&self) -> Option<GameSession> {
        self.session.read().clone()
    }

    /// One player's current state.
    pub fn player(&self, player_id: &PlayerId) -> Option<PlayerState> {
        self.players.read().get(player_id).cloned()
    }

    /// Owned copy of the current player projection. Never a live reference.
    pub fn player_states(&self) -> HashMap<PlayerId, PlayerState> {
        self.players.read().clone()
    }

    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    /// Point-in-time copy of session and players together.
    pub fn snapshot(&self) -> (Option<GameSession>, HashMap<PlayerId, PlayerState>) {
        let session = self.session.read().clone();
        let players = self.players.read().clone();
        (session, players)
    }

    /// Drop everything. Used on disconnect; the projection is rebuilt from
    /// the snapshot load on the next connect.
    pub fn clear(&self) {
        self.players.write().clear();
        *self.session.write() = None;
    }
}
