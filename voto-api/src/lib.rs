// Voto API Library
//
// HTTP routes and the live-session WebSocket endpoint

pub mod http;
pub mod impls;

// Re-export commonly used types
pub use http::{create_router, AppState};
