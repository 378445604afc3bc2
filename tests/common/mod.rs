//! Shared in-memory collaborators for integration tests.

#![allow(dead_code)]

use crossbeam_channel::{bounded, Receiver, Sender};
use gamesync::{
    Backend, ChangeEvent, Channel, FeedProvider, Filter, GameObserver, GameSession, PlayerState,
    Result, Row, SyncError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll until `condition` holds. The feed consumers run on their own
/// threads, so assertions on projected state need to wait for delivery.
pub fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not met within 2s");
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// --- Row builders ---

pub fn player_row(id: &str, session: &str, player: &str, x: f64, y: f64, score: i64) -> Row {
    as_row(json!({
        "id": id,
        "session_id": session,
        "player_id": player,
        "x_pos": x,
        "y_pos": y,
        "score": score,
    }))
}

pub fn session_row(id: &str, lobby: &str, winning_score: i64, ended: bool) -> Row {
    let ended_at = if ended {
        json!("2026-08-29T12:00:00Z")
    } else {
        json!(null)
    };
    as_row(json!({
        "id": id,
        "lobby_id": lobby,
        "winning_score": winning_score,
        "map_width": 1080,
        "map_height": 1080,
        "started_at": "2026-08-29T11:00:00Z",
        "ended_at": ended_at,
    }))
}

pub fn as_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {:?}", other),
    }
}

// --- In-memory persistence backend ---

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    rpc_results: Mutex<HashMap<String, Vec<Row>>>,
    fail_tables: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, table: &str, row: Row) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Make every select against `table` fail.
    pub fn fail_table(&self, table: &str) {
        self.fail_tables.lock().insert(table.to_string());
    }

    pub fn set_rpc_result(&self, procedure: &str, rows: Vec<Row>) {
        self.rpc_results
            .lock()
            .insert(procedure.to_string(), rows);
    }

    fn check_failure(&self, table: &str) -> Result<()> {
        if self.fail_tables.lock().contains(table) {
            return Err(SyncError::Provider(format!("select on {} refused", table)));
        }
        Ok(())
    }

    fn matching(&self, table: &str, filter: &Filter) -> Vec<Row> {
        self.tables
            .lock()
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| column_matches(row, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn column_matches(row: &Row, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(s)) => s == &filter.value,
        Some(other) => other.to_string() == filter.value,
        None => false,
    }
}

impl Backend for MemoryBackend {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>> {
        self.check_failure(table)?;
        Ok(self.matching(table, filter))
    }

    fn select_one(&self, table: &str, filter: &Filter) -> Result<Row> {
        self.check_failure(table)?;
        self.matching(table, filter)
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::RowNotFound {
                table: table.to_string(),
            })
    }

    fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.seed(table, row.clone());
        Ok(row)
    }

    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Row> {
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = None;
        for row in rows.iter_mut() {
            if column_matches(row, filter) {
                for (key, value) in &changes {
                    row.insert(key.clone(), value.clone());
                }
                updated.get_or_insert_with(|| row.clone());
            }
        }
        updated.ok_or_else(|| SyncError::RowNotFound {
            table: table.to_string(),
        })
    }

    fn rpc(&self, procedure: &str, _params: Row) -> Result<Vec<Row>> {
        Ok(self
            .rpc_results
            .lock()
            .get(procedure)
            .cloned()
            .unwrap_or_default())
    }
}

// --- In-memory change-feed provider ---

#[derive(Default)]
struct FeedState {
    /// Channel name -> registered (table, sender) feeds.
    channels: HashMap<String, Vec<(String, Sender<ChangeEvent>)>>,
    subscribed: HashSet<String>,
    fail_subscribe: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryFeed {
    state: Arc<Mutex<FeedState>>,
}

impl MemoryFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `subscribe` fail for the named channel.
    pub fn fail_subscribe_on(&self, channel: &str) {
        self.state
            .lock()
            .fail_subscribe
            .insert(channel.to_string());
    }

    /// Undo [`fail_subscribe_on`](Self::fail_subscribe_on).
    pub fn allow_subscribe_on(&self, channel: &str) {
        self.state.lock().fail_subscribe.remove(channel);
    }

    /// Deliver an event to every feed registered for `table`.
    pub fn push(&self, table: &str, event: ChangeEvent) {
        let state = self.state.lock();
        for feeds in state.channels.values() {
            for (feed_table, sender) in feeds {
                if feed_table == table {
                    let _ = sender.send(event.clone());
                }
            }
        }
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().subscribed.iter().cloned().collect();
        names.sort();
        names
    }

    /// Channels with at least one registered feed still alive.
    pub fn open_channel_count(&self) -> usize {
        self.state.lock().channels.len()
    }
}

impl FeedProvider for MemoryFeed {
    fn open_channel(&self, name: &str) -> Result<Box<dyn Channel>> {
        Ok(Box::new(MemoryChannel {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryChannel {
    name: String,
    state: Arc<Mutex<FeedState>>,
}

impl Channel for MemoryChannel {
    fn change_feed(
        &self,
        table: &str,
        _filter: &Filter,
        buffer: usize,
    ) -> Result<Receiver<ChangeEvent>> {
        let (tx, rx) = bounded(buffer);
        self.state
            .lock()
            .channels
            .entry(self.name.clone())
            .or_default()
            .push((table.to_string(), tx));
        Ok(rx)
    }

    fn subscribe(&self, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_subscribe.contains(&self.name) {
            return Err(SyncError::Subscribe {
                channel: self.name.clone(),
                reason: "subscription refused".to_string(),
            });
        }
        state.subscribed.insert(self.name.clone());
        Ok(())
    }

    fn unsubscribe(&self) {
        let mut state = self.state.lock();
        // Dropping the senders disconnects any consumer still draining
        state.channels.remove(&self.name);
        state.subscribed.remove(&self.name);
    }
}

// --- Recording observer ---

#[derive(Default)]
pub struct RecordingObserver {
    pub player_events: Mutex<Vec<PlayerState>>,
    pub session_events: Mutex<Vec<GameSession>>,
    game_overs: AtomicUsize,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn game_over_count(&self) -> usize {
        self.game_overs.load(Ordering::SeqCst)
    }

    pub fn player_event_count(&self) -> usize {
        self.player_events.lock().len()
    }

    pub fn session_event_count(&self) -> usize {
        self.session_events.lock().len()
    }
}

impl GameObserver for RecordingObserver {
    fn on_player_state_changed(&self, state: &PlayerState) {
        self.player_events.lock().push(state.clone());
    }

    fn on_session_changed(&self, session: &GameSession) {
        self.session_events.lock().push(session.clone());
    }

    fn on_game_over(&self) {
        self.game_overs.fetch_add(1, Ordering::SeqCst);
    }
}
