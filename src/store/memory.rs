//! In-memory record store for tests

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{LoadError, SaveError, StoreError};
use super::RecordStore;
use crate::inventory::Item;

#[derive(Default)]
struct MemoryState {
    rows: Vec<Item>,
    saves: usize,
    fail_loads: bool,
    fail_saves: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<Item>) -> Self {
        let store = Self::default();
        store.state.lock().rows = rows;
        store
    }

    pub fn rows(&self) -> Vec<Item> {
        self.state.lock().rows.clone()
    }

    /// Replace the stored rows as another client's save would
    pub fn overwrite(&self, rows: Vec<Item>) {
        self.state.lock().rows = rows;
    }

    pub fn saves(&self) -> usize {
        self.state.lock().saves
    }

    pub fn fail_loads(&self, fail: bool) {
        self.state.lock().fail_loads = fail;
    }

    pub fn fail_saves(&self, fail: bool) {
        self.state.lock().fail_saves = fail;
    }
}

fn unavailable() -> StoreError {
    StoreError::Api {
        status: 503,
        body: "store unavailable".to_string(),
    }
}

impl RecordStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Item>, LoadError> {
        let state = self.state.lock();
        if state.fail_loads {
            return Err(LoadError::Store(unavailable()));
        }
        Ok(state.rows.clone())
    }

    async fn save(&self, items: &[Item]) -> Result<(), SaveError> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(SaveError::Clear(unavailable()));
        }
        state.rows = items.to_vec();
        state.saves += 1;
        Ok(())
    }
}
