//! Remote record store for the inventory sheet

pub mod auth;
pub mod credential;
pub mod error;
pub mod locator;
#[cfg(test)]
pub mod memory;
pub mod rows;
pub mod sheets;

use std::future::Future;

use crate::inventory::Item;

pub use credential::ServiceAccountKey;
pub use error::{LoadError, SaveError};
pub use sheets::SheetsClient;

/// Whole-table read and write over the `name, spec, qty` schema.
///
/// `save` replaces everything the store holds; there is no versioning, so the
/// last writer wins.
pub trait RecordStore: Clone + Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<Vec<Item>, LoadError>> + Send;

    fn save(&self, items: &[Item]) -> impl Future<Output = Result<(), SaveError>> + Send;
}
