//! # gamesync
//!
//! Real-time game-state synchronization for multiplayer sessions. Keeps a
//! local, thread-safe projection of player positions, scores, and session
//! lifecycle eventually consistent with server-owned truth, fed by an
//! asynchronous change feed of insert/update/delete notifications rather
//! than polling.
//!
//! ## Core Concepts
//!
//! - **Channel session**: owns two subscriptions per game session (the
//!   player-state feed and the session feed) plus the connect/snapshot/
//!   disconnect lifecycle
//! - **State store**: keyed last-writer-wins projection of per-player state
//!   and the session record, safe under concurrent feed consumers
//! - **Feed decoding**: loosely-typed wire records become tagged
//!   [`PlayerFeedEvent`] and [`SessionFeedEvent`] variants; numeric fields
//!   coerce best-effort and default to zero rather than dropping a record
//! - **Observers**: panic-isolated fan-out of state changes and the
//!   exactly-once game-over notification
//!
//! ## Example
//!
//! ```ignore
//! use gamesync::{ChannelSession, PlayerId, SessionId, SyncConfig};
//!
//! let session = ChannelSession::new(backend, feeds, SyncConfig::default());
//! session.add_observer(renderer);
//!
//! session.connect(SessionId::new("session-1"), PlayerId::new("player-1"))?;
//!
//! // ... feed events now update the projection ...
//! let players = session.player_states();
//!
//! session.disconnect()?;
//! ```

pub mod actions;
pub mod decode;
pub mod error;
pub mod lifecycle;
pub mod observers;
pub mod provider;
pub mod session;
pub mod state;
pub mod types;

// Re-exports
pub use actions::{ActionClient, MoveOutcome};
pub use decode::{decode_player_change, decode_session_change, PlayerFeedEvent, SessionFeedEvent};
pub use error::{Result, SyncError};
pub use lifecycle::GameOverDetector;
pub use observers::{GameObserver, ObserverId, ObserverRegistry};
pub use provider::{
    Backend, ChangeEvent, ChangeOp, Channel, FeedProvider, Filter, Row, GAME_SESSION_TABLE,
    PLAYER_STATE_TABLE,
};
pub use session::{ChannelSession, SyncConfig};
pub use state::StateStore;
pub use types::{GameSession, PlayerId, PlayerState, RowId, SessionId, Timestamp};
