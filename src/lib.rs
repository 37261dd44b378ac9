//! Meetime - tracks time spent in Google Meet and serves session statistics
//!
//! This crate provides:
//! - SQLite storage for tracked sessions
//! - Session create/extend/close with validation
//! - Per-user statistics (totals, daily activity, recent sessions, month insights)
//! - HTTP API for the tracker and the dashboard
//! - The tracker itself: a tab-sampling loop that opens, extends and closes sessions
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use meetime::{Config, Core};
//!
//! let config = Config::from_file("~/.meetime/config.toml").unwrap();
//! let core = Core::new(config).unwrap();
//! // core.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! meetime --config ~/.meetime/config.toml
//! meetime --track
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod model;
pub mod shutdown;
pub mod stats;
pub mod tracker;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{CoreError, Result};
pub use handlers::SessionHandler;

use std::sync::Arc;

/// Core service wiring store, session logic and API together
pub struct Core {
    /// Configuration
    pub config: Config,

    /// Database connection
    pub db: Arc<Database>,

    /// Session business logic shared with the API
    sessions: Arc<SessionHandler>,
}

impl Core {
    /// Create a new Core instance with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.database_path())?;
        Ok(Core::with_database(config, Arc::new(db)))
    }

    /// Create a Core instance with an existing database
    pub fn with_database(config: Config, db: Arc<Database>) -> Self {
        let sessions = Arc::new(SessionHandler::new(db.clone()));
        Core {
            config,
            db,
            sessions,
        }
    }

    /// Start the HTTP API server (blocks until shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        api::serve(addr, self.sessions.clone(), &self.config).await
    }

    /// Session business logic
    pub fn sessions(&self) -> &Arc<SessionHandler> {
        &self.sessions
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}
