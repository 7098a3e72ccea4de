//! HTTP API layer.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router_with_config;
pub use state::AppState;
