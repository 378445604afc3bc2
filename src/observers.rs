//! Fan-out of state-change and lifecycle notifications.

use crate::types::{GameSession, PlayerState};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// Consumer of synchronization events (e.g. a rendering layer).
///
/// Callbacks are invoked from the feed consumer threads; implementations
/// should hand work off rather than block.
pub trait GameObserver: Send + Sync {
    /// A player's state was created or replaced.
    fn on_player_state_changed(&self, state: &PlayerState);

    /// The session record changed.
    fn on_session_changed(&self, session: &GameSession);

    /// The session reached its terminal state. Invoked at most once per
    /// connect lifetime.
    fn on_game_over(&self);
}

/// Handle for removing a registered observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Explicit, owned list of observers. Not a singleton: each channel session
/// owns its own registry.
pub struct ObserverRegistry {
    observers: RwLock<Vec<(ObserverId, Arc<dyn GameObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add(&self, observer: Arc<dyn GameObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove an observer. Returns false if the id was not registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn notify_player_state(&self, state: &PlayerState) {
        self.dispatch(|observer| observer.on_player_state_changed(state));
    }

    pub fn notify_session(&self, session: &GameSession) {
        self.dispatch(|observer| observer.on_session_changed(session));
    }

    pub fn notify_game_over(&self) {
        self.dispatch(|observer| observer.on_game_over());
    }

    /// Invoke a callback on every observer, isolating each call: one
    /// panicking observer must not starve the rest or kill the consumer
    /// thread. The lock is not held across callbacks, so observers may
    /// re-enter the registry.
    fn dispatch<F>(&self, f: F)
    where
        F: Fn(&dyn GameObserver),
    {
        let observers: Vec<Arc<dyn GameObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                error!("observer panicked during dispatch; continuing with remaining observers");
            }
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
