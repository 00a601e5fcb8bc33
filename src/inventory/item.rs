//! Inventory rows and the ordered collection that holds them

use serde::{Deserialize, Serialize};

/// One cable row: name, free-text specification note, and stock count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub spec: String,
    /// May be negative in memory after a decrement (backorder)
    pub qty: i64,
}

impl Item {
    pub fn new(name: impl Into<String>, spec: impl Into<String>, qty: i64) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
            qty,
        }
    }

    /// Case-insensitive substring match on name or spec.
    /// `needle` must already be lowercased.
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.spec.to_lowercase().contains(needle)
    }
}

/// Direction of a quantity adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    pub fn sign(self) -> i64 {
        match self {
            Direction::Increment => 1,
            Direction::Decrement => -1,
        }
    }
}

/// Ordered inventory, in the row order the store returned.
/// Duplicate names are distinct rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.items.get_mut(index)
    }

    /// Append an item, returning its index
    pub(crate) fn push(&mut self, item: Item) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Item> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Indices of items whose name or spec contains `term`, ignoring case.
    /// An empty term matches every item.
    pub fn search(&self, term: &str) -> Vec<usize> {
        let needle = term.to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.matches(&needle))
            .map(|(index, _)| index)
            .collect()
    }
}

impl From<Vec<Item>> for Inventory {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}
