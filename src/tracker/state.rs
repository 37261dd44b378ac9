//! Tracker state and its on-disk copy
//!
//! The state file holds the installation's user id and the currently open
//! session, if any. It is rewritten through a temp file + rename so a crash
//! mid-write never leaves a truncated document behind.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A session the tracker is still extending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackerPhase {
    #[default]
    Idle,
    Open(OpenSession),
}

/// Everything the tracker remembers between ticks and restarts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    pub user_id: String,
    #[serde(default)]
    pub phase: TrackerPhase,
}

impl TrackerState {
    /// Fresh state for a new installation
    pub fn new_user() -> Self {
        TrackerState {
            user_id: Uuid::new_v4().to_string(),
            phase: TrackerPhase::Idle,
        }
    }

    pub fn open_session(&self) -> Option<&OpenSession> {
        match &self.phase {
            TrackerPhase::Open(open) => Some(open),
            TrackerPhase::Idle => None,
        }
    }
}

/// JSON file holding a [`TrackerState`]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        StateFile { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, `None` when the file does not exist yet
    pub fn load(&self) -> Result<Option<TrackerState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Read the state, generating and saving a new user id on first run
    pub fn load_or_init(&self) -> Result<TrackerState> {
        if let Some(state) = self.load()? {
            return Ok(state);
        }

        let state = TrackerState::new_user();
        self.save(&state)?;
        tracing::info!("Generated new user id: {}", state.user_id);
        Ok(state)
    }

    pub fn save(&self, state: &TrackerState) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| CoreError::Config(format!("Invalid state path: {}", self.path.display())))?;
        std::fs::create_dir_all(parent)?;

        let content = serde_json::to_string_pretty(state)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("tracker.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_user_id_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state").join("tracker.json"));

        let first = file.load_or_init().unwrap();
        let second = file.load_or_init().unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.phase, TrackerPhase::Idle);
        assert!(Uuid::parse_str(&first.user_id).is_ok());
    }

    #[test]
    fn test_open_session_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("tracker.json"));

        let state = TrackerState {
            user_id: "user".into(),
            phase: TrackerPhase::Open(OpenSession {
                session_id: "s1".into(),
                started_at: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            }),
        };
        file.save(&state).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.open_session().unwrap().session_id, "s1");
        assert!(!dir.path().join("tracker.json.tmp").exists());
    }

    #[test]
    fn test_phase_json_shape() {
        let idle = serde_json::to_value(TrackerPhase::Idle).unwrap();
        assert_eq!(idle, serde_json::json!({ "state": "idle" }));

        // Older files without a phase default to idle
        let state: TrackerState = serde_json::from_str(r#"{ "user_id": "u" }"#).unwrap();
        assert_eq!(state.phase, TrackerPhase::Idle);
    }
}
