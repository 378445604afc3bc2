//! Decoding of loosely-typed change-feed records into typed domain events.
//!
//! The wire format does not guarantee numeric subtypes: a score may arrive as
//! an integer, a float, or a string. The coercion policy trades correctness
//! for availability: a field that is already numeric is used as-is, a string
//! gets a best-effort float parse, and anything else becomes `0`. A single
//! malformed field never drops an otherwise-useful record, but it can
//! silently inject a zero value.

use crate::provider::{ChangeEvent, ChangeOp, Row};
use crate::types::{GameSession, PlayerId, PlayerState, RowId, SessionId, Timestamp};
use serde_json::Value;

/// Strongly-typed view of one player-state feed notification.
#[derive(Clone, Debug)]
pub enum PlayerFeedEvent {
    Inserted(PlayerState),
    Updated(PlayerState),
    Removed(PlayerId),
    /// The record was structurally unusable (not merely malformed fields).
    DecodeFailed(String),
}

/// Strongly-typed view of one game-session feed notification.
#[derive(Clone, Debug)]
pub enum SessionFeedEvent {
    Updated(GameSession),
    /// The record was structurally unusable (not merely malformed fields).
    DecodeFailed(String),
}

/// Decode a notification from the player-state feed.
pub fn decode_player_change(event: &ChangeEvent) -> PlayerFeedEvent {
    match event.op {
        ChangeOp::Insert => PlayerFeedEvent::Inserted(player_from_row(&event.record)),
        ChangeOp::Update => PlayerFeedEvent::Updated(player_from_row(&event.record)),
        ChangeOp::Delete => match event.old_record.as_ref() {
            Some(old) => {
                PlayerFeedEvent::Removed(PlayerId(coerce_string(old.get("player_id"))))
            }
            None => PlayerFeedEvent::DecodeFailed("delete event without old record".to_string()),
        },
    }
}

/// Decode a notification from the game-session feed.
///
/// `prev` is the session currently held by the store, if any: when a record
/// omits `started_at` (or carries an unparseable one), the previously
/// observed value is kept.
pub fn decode_session_change(event: &ChangeEvent, prev: Option<&GameSession>) -> SessionFeedEvent {
    match event.op {
        ChangeOp::Insert | ChangeOp::Update => {
            SessionFeedEvent::Updated(session_from_row(&event.record, prev))
        }
        ChangeOp::Delete => {
            SessionFeedEvent::DecodeFailed(format!("unhandled {} on game session feed", event.op))
        }
    }
}

/// Build a [`PlayerState`] from a wire row, coercing every field.
pub fn player_from_row(row: &Row) -> PlayerState {
    PlayerState {
        id: RowId(coerce_string(row.get("id"))),
        session_id: SessionId(coerce_string(row.get("session_id"))),
        player_id: PlayerId(coerce_string(row.get("player_id"))),
        x: coerce_f64(row.get("x_pos")) as f32,
        y: coerce_f64(row.get("y_pos")) as f32,
        score: coerce_i64(row.get("score")),
    }
}

/// Build a [`GameSession`] from a wire row.
///
/// `started_at` is taken from the wire when present and parseable, falling
/// back to the previously observed value, then to now. A non-null `ended_at`
/// maps to the local observation time rather than the wire value; only its
/// presence matters for lifecycle detection.
pub fn session_from_row(row: &Row, prev: Option<&GameSession>) -> GameSession {
    let ended = matches!(row.get("ended_at"), Some(v) if !v.is_null());

    GameSession {
        id: SessionId(coerce_string(row.get("id"))),
        lobby_id: coerce_string(row.get("lobby_id")),
        winning_score: coerce_i64(row.get("winning_score")),
        map_width: coerce_i64(row.get("map_width")),
        map_height: coerce_i64(row.get("map_height")),
        started_at: coerce_timestamp(row.get("started_at"))
            .or_else(|| prev.map(|s| s.started_at))
            .unwrap_or_else(Timestamp::now),
        ended_at: if ended { Some(Timestamp::now()) } else { None },
    }
}

/// Best-effort numeric coercion. Numbers pass through, strings get a float
/// parse, everything else (including total parse failure) becomes `0`.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Integer variant of the coercion policy. Fractional values truncate.
pub fn coerce_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or(0),
        other => coerce_f64(other) as i64,
    }
}

/// Best-effort timestamp coercion. RFC 3339 strings parse to microsecond
/// precision, numbers are taken as microseconds since epoch, anything else
/// (including parse failure) is `None`.
pub fn coerce_timestamp(value: Option<&Value>) -> Option<Timestamp> {
    match value {
        Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| Timestamp(dt.timestamp_micros())),
        Some(Value::Number(n)) => n.as_i64().map(Timestamp),
        _ => None,
    }
}

/// Best-effort string coercion for identifier fields.
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
