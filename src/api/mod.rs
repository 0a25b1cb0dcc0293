//! HTTP adapter over the enhanced processor

pub mod documents;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod stats;
pub mod types;

pub use router::create_router;
pub use state::AppState;
