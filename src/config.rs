//! Configuration management for Meetime
//!
//! Loads settings from TOML file at ~/.meetime/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Tracker (client side) configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Data directory (defaults to ~/.meetime)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".meetime"))
        .unwrap_or_else(|| PathBuf::from(".meetime"))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Optional API key for authentication
    /// Required in Authorization header if set: "Authorization: Bearer <key>"
    #[serde(default)]
    pub api_key: Option<String>,

    /// Origins allowed by CORS in addition to any chrome-extension:// origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:3001".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            api_key: None,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Tracker configuration: where to look for Meet tabs and where to report sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the sessions API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer key sent to the API, matching `server.api_key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Seconds between two samples
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Pattern a tab URL must match to count as an active meeting
    #[serde(default = "default_url_pattern")]
    pub url_pattern: String,

    /// Chromium remote debugging endpoint used to list open tabs
    #[serde(default = "default_devtools_url")]
    pub devtools_url: String,

    /// Timeout for a single HTTP request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Dashboard base URL, shown by `--status` as `<dashboard_url>/<user_id>`
    #[serde(default)]
    pub dashboard_url: Option<String>,
}

fn default_api_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_check_interval() -> u64 {
    60 // One sample per minute
}

fn default_url_pattern() -> String {
    r"^https://meet\.google\.com/.*".to_string()
}

fn default_devtools_url() -> String {
    "http://127.0.0.1:9222".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            api_url: default_api_url(),
            api_key: None,
            check_interval_secs: default_check_interval(),
            url_pattern: default_url_pattern(),
            devtools_url: default_devtools_url(),
            request_timeout_secs: default_request_timeout(),
            dashboard_url: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default)]
    pub file_dir: Option<PathBuf>,

    /// Number of rotated log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

fn default_max_log_files() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            file_dir: None,
            max_files: default_max_log_files(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            tracker: TrackerConfig::default(),
            logging: LoggingConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the data directory, expanding ~ if present
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("meetime.db")
    }

    /// Tracker state file (user id + open session)
    pub fn tracker_state_path(&self) -> PathBuf {
        self.data_dir().join("tracker.json")
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MEETIME_SERVER_HOST") {
            self.server.host = host;
        }
        // Plain PORT is honored for container platforms; the namespaced one wins.
        for var in ["PORT", "MEETIME_SERVER_PORT"] {
            if let Ok(port) = std::env::var(var) {
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(key) = std::env::var("MEETIME_SERVER_API_KEY") {
            self.server.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Ok(data_dir) = std::env::var("MEETIME_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(api_url) = std::env::var("MEETIME_API_URL") {
            self.tracker.api_url = api_url;
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# Meetime Configuration

[server]
# Port to listen on (default: 3000)
port = 3000

# Host to bind to
# "127.0.0.1" = localhost only
# "0.0.0.0" = all interfaces (set api_key!)
host = "127.0.0.1"

# Optional API key for authentication
# If set, clients must send: Authorization: Bearer <api_key>
# api_key = "your-secret-key"

# Dashboard origins allowed by CORS (chrome-extension:// is always allowed)
cors_origins = ["http://localhost:3001", "http://127.0.0.1:3001"]

[tracker]
# Sessions API the tracker reports to
api_url = "http://127.0.0.1:3000"
# api_key = "your-secret-key"

# Seconds between two checks for open Meet tabs
check_interval_secs = 60

# Tabs are listed through Chromium's remote debugging endpoint
# (start the browser with --remote-debugging-port=9222)
devtools_url = "http://127.0.0.1:9222"
url_pattern = '^https://meet\.google\.com/.*'

# dashboard_url = "https://stats.example.com"

[logging]
# Write daily-rolling log files here in addition to stdout
# file_dir = "~/.meetime/logs"
max_files = 5
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
