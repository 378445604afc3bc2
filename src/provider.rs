//! Traits for the external persistence and change-feed collaborators.
//!
//! The synchronization core never talks to a concrete backend. It receives
//! its collaborator handles at construction:
//!
//! - [`Backend`]: request/response persistence and RPC (bulk snapshot loads,
//!   movement procedures).
//! - [`FeedProvider`] / [`Channel`]: named, filtered subscription endpoints
//!   delivering insert/update/delete notifications for one table.
//!
//! Ordering contract required of the feed: insert/update/delete for a given
//! row arrive in server commit order. No ordering is guaranteed across rows,
//! across channels, or between a bulk snapshot and concurrently arriving
//! live events.

use crate::error::Result;
use crossbeam_channel::Receiver;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Table holding one row per (session, player).
pub const PLAYER_STATE_TABLE: &str = "player_state";

/// Table holding one row per game session.
pub const GAME_SESSION_TABLE: &str = "game_session";

/// A loosely-typed record as delivered by the wire. The wire format does not
/// guarantee numeric subtypes; see [`crate::decode`] for the coercion policy.
pub type Row = serde_json::Map<String, Value>;

/// Equality filter applied to selects and change feeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Kind of change carried by a feed notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOp::Insert => write!(f, "insert"),
            ChangeOp::Update => write!(f, "update"),
            ChangeOp::Delete => write!(f, "delete"),
        }
    }
}

/// A single change-feed notification for one row.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub op: ChangeOp,

    /// The row after the change. Empty for deletes.
    pub record: Row,

    /// The row before the change. Only populated for deletes.
    pub old_record: Option<Row>,
}

impl ChangeEvent {
    pub fn insert(record: Row) -> Self {
        Self {
            op: ChangeOp::Insert,
            record,
            old_record: None,
        }
    }

    pub fn update(record: Row) -> Self {
        Self {
            op: ChangeOp::Update,
            record,
            old_record: None,
        }
    }

    pub fn delete(old_record: Row) -> Self {
        Self {
            op: ChangeOp::Delete,
            record: Row::new(),
            old_record: Some(old_record),
        }
    }
}

/// Persistence/RPC collaborator.
pub trait Backend: Send + Sync {
    /// Fetch all rows matching the filter.
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>>;

    /// Fetch exactly one row matching the filter.
    fn select_one(&self, table: &str, filter: &Filter) -> Result<Row>;

    /// Insert a row, returning it as stored.
    fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Apply changes to all rows matching the filter, returning the first
    /// updated row.
    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Row>;

    /// Invoke a named server-side procedure.
    fn rpc(&self, procedure: &str, params: Row) -> Result<Vec<Row>>;
}

/// Change-feed collaborator: opens named channels.
pub trait FeedProvider: Send + Sync {
    fn open_channel(&self, name: &str) -> Result<Box<dyn Channel>>;
}

/// A named subscription endpoint over which change events for one table are
/// delivered.
pub trait Channel: Send + Sync {
    /// Register a filtered feed, delivered over a bounded channel holding at
    /// most `buffer` undrained events.
    ///
    /// Must be called before [`Channel::subscribe`]: events delivered during
    /// the acknowledgement window would otherwise be dropped.
    fn change_feed(&self, table: &str, filter: &Filter, buffer: usize)
        -> Result<Receiver<ChangeEvent>>;

    /// Block until the subscription is acknowledged, or fail once `timeout`
    /// elapses.
    fn subscribe(&self, timeout: Duration) -> Result<()>;

    /// Stop delivery on this channel. Registered feed senders are dropped.
    fn unsubscribe(&self);
}
