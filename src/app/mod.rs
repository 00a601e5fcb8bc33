//! Application wiring

pub mod sessions;
pub mod state;

pub use sessions::SharedSession;
pub use state::AppState;
