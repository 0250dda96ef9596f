//! HTTP API layer for the rollup engine.
//!
//! Authentication and usage metering sit in front of this service; no auth
//! logic lives here.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
