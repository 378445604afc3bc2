//! Request/response actions invoked over the backend's RPC surface.
//!
//! These are the origin of the server-side mutations that the change feed
//! later echoes back. Movement-boundary arithmetic lives server-side; the
//! client only reports the outcome.

use crate::decode::coerce_string;
use crate::error::{Result, SyncError};
use crate::provider::{Backend, Row};
use crate::types::{PlayerId, SessionId};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a movement procedure call.
///
/// An unsuccessful move (e.g. the player is at a map boundary) is a normal
/// outcome, not an error.
#[derive(Clone, Debug, Deserialize)]
pub struct MoveOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub new_x_pos: Option<f64>,
    #[serde(default)]
    pub new_y_pos: Option<f64>,
}

impl MoveOutcome {
    fn no_response() -> Self {
        Self {
            success: false,
            message: "no response from server".to_string(),
            new_x_pos: None,
            new_y_pos: None,
        }
    }
}

/// Thin client for the named server-side procedures.
pub struct ActionClient {
    backend: Arc<dyn Backend>,
}

impl ActionClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn move_up(&self, player: &PlayerId, session: &SessionId) -> Result<MoveOutcome> {
        self.call_move("move_up", player, session)
    }

    pub fn move_down(&self, player: &PlayerId, session: &SessionId) -> Result<MoveOutcome> {
        self.call_move("move_down", player, session)
    }

    pub fn move_left(&self, player: &PlayerId, session: &SessionId) -> Result<MoveOutcome> {
        self.call_move("move_left", player, session)
    }

    pub fn move_right(&self, player: &PlayerId, session: &SessionId) -> Result<MoveOutcome> {
        self.call_move("move_right", player, session)
    }

    fn call_move(
        &self,
        procedure: &str,
        player: &PlayerId,
        session: &SessionId,
    ) -> Result<MoveOutcome> {
        let mut params = Row::new();
        params.insert(
            "p_player_id".to_string(),
            Value::String(player.as_str().to_string()),
        );
        params.insert(
            "p_session_id".to_string(),
            Value::String(session.as_str().to_string()),
        );

        let rows = self.backend.rpc(procedure, params)?;
        let outcome = match rows.into_iter().next() {
            Some(row) => serde_json::from_value::<MoveOutcome>(Value::Object(row))?,
            // An empty result set is a failed move, not a transport error
            None => MoveOutcome::no_response(),
        };

        debug!(procedure, success = outcome.success, "movement rpc completed");
        Ok(outcome)
    }

    /// Start a game session for a lobby. Returns the new session's id.
    pub fn start_game_session(
        &self,
        lobby_id: &str,
        player: &PlayerId,
    ) -> Result<SessionId> {
        let mut params = Row::new();
        params.insert(
            "p_player_id".to_string(),
            Value::String(player.as_str().to_string()),
        );
        params.insert("p_lobby_id".to_string(), Value::String(lobby_id.to_string()));

        let rows = self.backend.rpc("start_game_session", params)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Provider("start_game_session returned no rows".to_string()))?;

        let success = row
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !success {
            let message = coerce_string(row.get("message"));
            return Err(SyncError::Provider(message));
        }

        let session_id = coerce_string(row.get("session_id"));
        if session_id.is_empty() {
            return Err(SyncError::Provider(
                "start_game_session succeeded without a session id".to_string(),
            ));
        }

        Ok(SessionId(session_id))
    }
}
