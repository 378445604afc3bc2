//! Error types for the synchronization layer.
//!
//! Boundary failures (subscribe, snapshot) surface as values and leave the
//! session disconnected; nothing here is meant to take the process down.

use thiserror::Error;

/// Main error type for synchronization operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("subscribe failed on channel {channel}: {reason}")]
    Subscribe { channel: String, reason: String },

    #[error("subscribe timed out on channel {channel}")]
    SubscribeTimeout { channel: String },

    #[error("snapshot load failed: {0}")]
    Snapshot(String),

    #[error("row not found in {table}")]
    RowNotFound { table: String },

    #[error("not connected to a game session")]
    NotConnected,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
