//! HTTP server: application state and routes.

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{AppState, AppStateBuilder};
