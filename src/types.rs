//! Core domain types for game-state synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a game session.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a player within a session.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row primary key as assigned by the persistence layer.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub String);

impl RowId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// One player's state within a session.
///
/// At most one live `PlayerState` exists per `(session_id, player_id)`.
/// Replaced wholesale on every update; there is no per-field merging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Row primary key.
    pub id: RowId,

    /// Session this state belongs to.
    pub session_id: SessionId,

    /// Player this state belongs to (unique within a session).
    pub player_id: PlayerId,

    /// Map x coordinate.
    pub x: f32,

    /// Map y coordinate.
    pub y: f32,

    /// Non-negative score.
    pub score: i64,
}

/// A game session. At most one per lobby.
///
/// `ended_at` is monotonic: once set it is never cleared, and the transition
/// from unset to set happens at most once per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Row primary key.
    pub id: SessionId,

    /// The lobby this session was started from (unique).
    pub lobby_id: String,

    /// Score that ends the game when a player reaches it.
    pub winning_score: i64,

    /// Map width in world units.
    pub map_width: i64,

    /// Map height in world units.
    pub map_height: i64,

    /// When the session started.
    pub started_at: Timestamp,

    /// Set exactly once, when the game ends.
    pub ended_at: Option<Timestamp>,
}

impl GameSession {
    /// Whether the session has reached its terminal state.
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}
