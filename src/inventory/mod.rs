//! Inventory domain: items, search, and the per-user editing session

pub mod item;
pub mod session;

pub use item::{Direction, Item};
pub use session::{Session, SessionError};
