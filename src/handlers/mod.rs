//! Business logic handlers
//!
//! These handlers contain the session logic used by the HTTP API.

pub mod sessions;

// Re-export commonly used types
pub use sessions::*;
