//! One user's working copy of the inventory
//!
//! Every mutation is applied in memory and then the full inventory is saved
//! back to the store before the call returns.

use tracing::{error, info, warn};

use super::item::{Direction, Inventory, Item};
use crate::store::{LoadError, RecordStore, SaveError};

/// Rejected user input; nothing is mutated or saved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Item name must not be empty")]
    EmptyName,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No item at index {index} (inventory has {len} items)")]
    NoSuchItem { index: usize, len: usize },

    /// The in-memory change was kept but may not have reached the store
    #[error("Change may not have reached the shared store: {0}")]
    Save(#[from] SaveError),
}

pub struct Session<S> {
    store: S,
    inventory: Inventory,
    /// Set when the last save failed and memory is ahead of the store
    unsynced: bool,
    /// Message from the last failed load, if the inventory fell back to empty
    load_warning: Option<String>,
}

impl<S: RecordStore> Session<S> {
    /// Open a session, loading the inventory from the store.
    /// A failed load leaves the session empty with a load warning.
    pub async fn open(store: S) -> Self {
        let mut session = Self {
            store,
            inventory: Inventory::default(),
            unsynced: false,
            load_warning: None,
        };
        // Failure is recorded in load_warning
        let _ = session.refresh().await;
        session
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn is_unsynced(&self) -> bool {
        self.unsynced
    }

    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    /// Replace the inventory with the store's current contents. On failure the
    /// inventory becomes empty and the error is returned.
    pub async fn refresh(&mut self) -> Result<usize, LoadError> {
        self.unsynced = false;
        match self.store.load().await {
            Ok(items) => {
                self.inventory = Inventory::from(items);
                self.load_warning = None;
                Ok(self.inventory.len())
            }
            Err(err) => {
                warn!(error = %err, "Inventory load failed, showing empty inventory");
                self.inventory = Inventory::default();
                self.load_warning = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Append a new item and save. Negative quantities are raised to 0.
    pub async fn add_item(&mut self, name: &str, spec: &str, qty: i64) -> Result<usize, SessionError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let index = self.inventory.push(Item::new(name, spec, qty.max(0)));
        info!(index, item = name, "Item added");
        self.persist().await?;
        Ok(index)
    }

    /// Move `delta` units in `direction` and save, returning the new quantity.
    /// A zero delta changes nothing and skips the save. Quantities are not
    /// clamped, so a decrement may go below zero.
    pub async fn adjust_qty(
        &mut self,
        index: usize,
        delta: u32,
        direction: Direction,
    ) -> Result<i64, SessionError> {
        let len = self.inventory.len();
        let item = self
            .inventory
            .get_mut(index)
            .ok_or(SessionError::NoSuchItem { index, len })?;

        if delta == 0 {
            return Ok(item.qty);
        }

        item.qty = item.qty.saturating_add(direction.sign() * i64::from(delta));
        let qty = item.qty;
        if qty < 0 {
            warn!(index, qty, "Quantity is below zero");
        }
        info!(index, delta, ?direction, qty, "Quantity adjusted");

        self.persist().await?;
        Ok(qty)
    }

    /// Remove the item at `index` and save
    pub async fn delete_item(&mut self, index: usize) -> Result<Item, SessionError> {
        let len = self.inventory.len();
        let removed = self
            .inventory
            .remove(index)
            .ok_or(SessionError::NoSuchItem { index, len })?;
        info!(index, item = %removed.name, "Item deleted");

        self.persist().await?;
        Ok(removed)
    }

    /// Indices of matching items; never touches the store
    pub fn search(&self, term: &str) -> Vec<usize> {
        self.inventory.search(term)
    }

    async fn persist(&mut self) -> Result<(), SaveError> {
        match self.store.save(self.inventory.items()).await {
            Ok(()) => {
                self.unsynced = false;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Inventory save failed, change kept in memory only");
                self.unsynced = true;
                Err(err)
            }
        }
    }
}
