//! HTTP surface: one inventory session per caller

pub mod extract;
pub mod middleware;
pub mod routes;

pub use routes::build_router;
