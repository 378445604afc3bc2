//! Channel session: connect, snapshot load, live listening, disconnect.
//!
//! A [`ChannelSession`] owns the lifecycle of two logical subscriptions for
//! one game session (the player-state feed and the session feed) plus the
//! local projection they maintain. Connecting opens both channels, registers
//! the feeds *before* subscribing (so no event delivered during the
//! acknowledgement window is dropped), performs one bulk snapshot load, and
//! then spawns one consumer thread per feed.
//!
//! Known limitation, preserved from the observed behavior: the snapshot load
//! is not reconciled against events arriving during the connect window. Rows
//! carry no version or timestamp, so a live update may be overwritten by the
//! snapshot's copy of the same row, or vice versa.

use crate::decode::{
    decode_player_change, decode_session_change, player_from_row, session_from_row,
    PlayerFeedEvent, SessionFeedEvent,
};
use crate::error::{Result, SyncError};
use crate::lifecycle::GameOverDetector;
use crate::observers::{GameObserver, ObserverId, ObserverRegistry};
use crate::provider::{
    Backend, ChangeEvent, Channel, FeedProvider, Filter, GAME_SESSION_TABLE, PLAYER_STATE_TABLE,
};
use crate::state::StateStore;
use crate::types::{GameSession, PlayerId, PlayerState, SessionId};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often consumer threads wake to check the stop flag while idle.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Bound on each feed's undrained event buffer.
    pub feed_buffer_size: usize,

    /// How long `connect` waits for each subscription acknowledgement.
    pub subscribe_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed_buffer_size: 1024,
            subscribe_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything owned by one live connection. Dropped wholesale on disconnect.
struct LiveLink {
    session_id: SessionId,
    local_player_id: PlayerId,
    player_channel: Box<dyn Channel>,
    session_channel: Box<dyn Channel>,
    /// Set when disconnect begins; consumers discard in-flight events.
    stop: Arc<AtomicBool>,
    consumers: Vec<JoinHandle<()>>,
}

/// Client-side synchronization endpoint for one game session at a time.
pub struct ChannelSession {
    backend: Arc<dyn Backend>,
    feeds: Arc<dyn FeedProvider>,
    config: SyncConfig,
    store: Arc<StateStore>,
    observers: Arc<ObserverRegistry>,
    link: Mutex<Option<LiveLink>>,
    connected: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl ChannelSession {
    pub fn new(
        backend: Arc<dyn Backend>,
        feeds: Arc<dyn FeedProvider>,
        config: SyncConfig,
    ) -> Self {
        Self {
            backend,
            feeds,
            config,
            store: Arc::new(StateStore::new()),
            observers: Arc::new(ObserverRegistry::new()),
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Register an observer for state-change and lifecycle notifications.
    pub fn add_observer(&self, observer: Arc<dyn GameObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Connect to a game session: open both channels, register feeds,
    /// subscribe, load the bulk snapshot, start the consumers.
    ///
    /// On failure the session stays disconnected and the error doubles as the
    /// status; no retry is attempted here, retrying is the caller's call.
    ///
    /// Calling `connect` again without an intervening [`disconnect`] replaces
    /// the live link and leaks the previous subscriptions.
    ///
    /// [`disconnect`]: ChannelSession::disconnect
    pub fn connect(&self, session_id: SessionId, local_player_id: PlayerId) -> Result<String> {
        match self.try_connect(&session_id, &local_player_id) {
            Ok(status) => {
                *self.last_error.lock() = None;
                info!(session = %session_id, "{}", status);
                Ok(status)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                *self.last_error.lock() = Some(e.to_string());
                error!(session = %session_id, "failed to connect: {}", e);
                Err(e)
            }
        }
    }

    fn try_connect(&self, session_id: &SessionId, local_player_id: &PlayerId) -> Result<String> {
        let player_channel = self
            .feeds
            .open_channel(&player_channel_name(session_id))?;
        let session_channel = self
            .feeds
            .open_channel(&session_channel_name(session_id))?;

        // Feeds are registered before subscribing: events delivered during
        // the acknowledgement window would otherwise be dropped.
        let player_rx = player_channel.change_feed(
            PLAYER_STATE_TABLE,
            &Filter::eq("session_id", session_id.as_str()),
            self.config.feed_buffer_size,
        )?;
        let session_rx = session_channel.change_feed(
            GAME_SESSION_TABLE,
            &Filter::eq("id", session_id.as_str()),
            self.config.feed_buffer_size,
        )?;

        player_channel.subscribe(self.config.subscribe_timeout)?;
        if let Err(e) = session_channel.subscribe(self.config.subscribe_timeout) {
            // The first subscription is already live at the provider
            player_channel.unsubscribe();
            return Err(e);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let detector = Arc::new(GameOverDetector::new());
        let consumers = vec![
            self.spawn_player_consumer(player_rx, Arc::clone(&stop)),
            self.spawn_session_consumer(session_rx, detector, Arc::clone(&stop)),
        ];

        if let Err(e) = self.load_snapshot(session_id) {
            stop.store(true, Ordering::SeqCst);
            player_channel.unsubscribe();
            session_channel.unsubscribe();
            for handle in consumers {
                let _ = handle.join();
            }
            self.store.clear();
            return Err(e);
        }

        *self.link.lock() = Some(LiveLink {
            session_id: session_id.clone(),
            local_player_id: local_player_id.clone(),
            player_channel,
            session_channel,
            stop,
            consumers,
        });
        self.connected.store(true, Ordering::SeqCst);

        Ok(format!("connected to game session {}", session_id))
    }

    /// One-time bulk fetch seeding the store: the session row, then all
    /// player rows. Runs before the session is reported connected, so
    /// observers never see a connected-but-empty state.
    fn load_snapshot(&self, session_id: &SessionId) -> Result<()> {
        let row = self
            .backend
            .select_one(GAME_SESSION_TABLE, &Filter::eq("id", session_id.as_str()))
            .map_err(|e| SyncError::Snapshot(e.to_string()))?;
        let session = session_from_row(&row, None);
        self.store.set_session(session.clone());
        self.observers.notify_session(&session);

        let rows = self
            .backend
            .select(
                PLAYER_STATE_TABLE,
                &Filter::eq("session_id", session_id.as_str()),
            )
            .map_err(|e| SyncError::Snapshot(e.to_string()))?;
        let count = rows.len();
        for row in &rows {
            let state = player_from_row(row);
            debug!(player = %state.player_id, x = state.x, y = state.y, "snapshot player state");
            self.store.upsert_player(state.clone());
            self.observers.notify_player_state(&state);
        }

        info!(players = count, "initial game state loaded");
        Ok(())
    }

    fn spawn_player_consumer(
        &self,
        rx: Receiver<ChangeEvent>,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let observers = Arc::clone(&self.observers);

        std::thread::spawn(move || {
            drain(&rx, &stop, |event| match decode_player_change(&event) {
                PlayerFeedEvent::Inserted(state) | PlayerFeedEvent::Updated(state) => {
                    debug!(player = %state.player_id, x = state.x, y = state.y, score = state.score,
                        "player state applied");
                    store.upsert_player(state.clone());
                    observers.notify_player_state(&state);
                }
                PlayerFeedEvent::Removed(player_id) => {
                    debug!(player = %player_id, "player left");
                    store.remove_player(&player_id);
                }
                PlayerFeedEvent::DecodeFailed(reason) => {
                    warn!("skipping player feed event: {}", reason);
                }
            });
        })
    }

    fn spawn_session_consumer(
        &self,
        rx: Receiver<ChangeEvent>,
        detector: Arc<GameOverDetector>,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let observers = Arc::clone(&self.observers);

        std::thread::spawn(move || {
            drain(&rx, &stop, |event| {
                let prev = store.session();
                match decode_session_change(&event, prev.as_ref()) {
                    SessionFeedEvent::Updated(session) => {
                        if detector.observe(&session) {
                            info!("game over");
                            observers.notify_game_over();
                        }
                        store.set_session(session.clone());
                        observers.notify_session(&session);
                        debug!("game session updated");
                    }
                    SessionFeedEvent::DecodeFailed(reason) => {
                        warn!("skipping session feed event: {}", reason);
                    }
                }
            });
        })
    }

    /// Unsubscribe both channels, stop the consumers, and clear the
    /// projection. A no-op when already disconnected.
    pub fn disconnect(&self) -> Result<String> {
        let link = self.link.lock().take();
        self.connected.store(false, Ordering::SeqCst);

        let Some(link) = link else {
            return Ok("already disconnected".to_string());
        };

        link.stop.store(true, Ordering::SeqCst);
        link.player_channel.unsubscribe();
        link.session_channel.unsubscribe();
        for handle in link.consumers {
            let _ = handle.join();
        }

        self.store.clear();
        info!(session = %link.session_id, "disconnected from game session");
        Ok(format!("disconnected from game session {}", link.session_id))
    }

    /// Read-only copy of the current player projection.
    pub fn player_states(&self) -> HashMap<PlayerId, PlayerState> {
        self.store.player_states()
    }

    /// Current session projection, or `None` if never connected.
    pub fn current_session(&self) -> Option<GameSession> {
        self.store.session()
    }

    /// Point-in-time copy of session and players together.
    pub fn snapshot(&self) -> (Option<GameSession>, HashMap<PlayerId, PlayerState>) {
        self.store.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The session currently connected to, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.link.lock().as_ref().map(|link| link.session_id.clone())
    }

    /// The local player id given to `connect`, if connected.
    pub fn local_player_id(&self) -> Option<PlayerId> {
        self.link
            .lock()
            .as_ref()
            .map(|link| link.local_player_id.clone())
    }

    /// Human-readable description of the last boundary failure.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

fn player_channel_name(session_id: &SessionId) -> String {
    format!("player-state-{}", session_id)
}

fn session_channel_name(session_id: &SessionId) -> String {
    format!("game-session-{}", session_id)
}

/// Consume a feed until the stop flag is set or the sender side goes away.
/// Events pulled after the stop flag is raised are discarded, never partially
/// applied.
fn drain<F>(rx: &Receiver<ChangeEvent>, stop: &AtomicBool, mut apply: F)
where
    F: FnMut(ChangeEvent),
{
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match rx.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(event) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                apply(event);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
