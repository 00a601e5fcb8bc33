//! Per-user inventory sessions keyed by session id

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::inventory::Session;
use crate::store::RecordStore;

/// A session behind an async lock: one action at a time runs to completion,
/// including its save
pub type SharedSession<S> = Arc<Mutex<Session<S>>>;

/// Sessions untouched for this long are dropped
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Upper bound on the time between eviction sweeps
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

struct Entry<S> {
    session: SharedSession<S>,
    last_used: parking_lot::Mutex<Instant>,
}

pub struct SessionRegistry<S> {
    store: S,
    sessions: DashMap<Uuid, Entry<S>>,
}

impl<S: RecordStore> SessionRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
        }
    }

    /// Look up a session and mark it as used
    pub fn get(&self, id: &Uuid) -> Option<SharedSession<S>> {
        self.sessions.get(id).map(|entry| {
            *entry.last_used.lock() = Instant::now();
            entry.session.clone()
        })
    }

    /// Open a new session, loading the inventory from the store
    pub async fn open(&self) -> (Uuid, SharedSession<S>) {
        let session = Session::open(self.store.clone()).await;
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(
            id,
            Entry {
                session: shared.clone(),
                last_used: parking_lot::Mutex::new(Instant::now()),
            },
        );
        info!(session = %id, active = self.sessions.len(), "Session opened");
        (id, shared)
    }

    pub fn close(&self, id: &Uuid) -> bool {
        let closed = self.sessions.remove(id).is_some();
        if closed {
            info!(session = %id, "Session closed");
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions unused for at least `max_idle`, returning how many went.
    /// A session a request still holds is kept.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            Arc::strong_count(&entry.session) > 1 || entry.last_used.lock().elapsed() < max_idle
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Sweep idle sessions until the task is dropped
    pub async fn run_eviction(self: Arc<Self>, max_idle: Duration) {
        let mut sweep = interval(max_idle.clamp(Duration::from_secs(1), MAX_SWEEP_PERIOD));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(idle_secs = max_idle.as_secs(), "Session eviction started");
        loop {
            sweep.tick().await;
            let evicted = self.evict_idle(max_idle);
            if evicted > 0 {
                info!(evicted, active = self.sessions.len(), "Idle sessions evicted");
            } else {
                debug!(active = self.sessions.len(), "No idle sessions");
            }
        }
    }
}
