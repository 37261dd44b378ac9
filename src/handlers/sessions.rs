//! Session handling logic
//!
//! Request bodies are validated into `Validated*` values before anything
//! touches the store.

use crate::db::{sessions as store, Database};
use crate::error::{CoreError, Result};
use crate::model::{parse_timestamp, Session};
use crate::stats::{self, MonthInsights, UserStats};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Body of `POST /sessions`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub start_time: String,
    pub end_time: String,
}

/// Body of `PUT /sessions/:id`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSessionRequest {
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreate {
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdate {
    pub end_time: DateTime<Utc>,
}

/// Accept only the canonical hyphenated form of a version 4 UUID
pub fn is_uuid_v4(raw: &str) -> bool {
    raw.len() == 36
        && Uuid::parse_str(raw)
            .map(|id| id.get_version_num() == 4 && id.get_variant() == uuid::Variant::RFC4122)
            .unwrap_or(false)
}

fn timestamp_field(name: &str, raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| {
        CoreError::Validation(format!("{} must be a valid ISO 8601 date string", name))
    })
}

fn ensure_ordered(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(CoreError::Validation(
            "end_time must be greater than or equal to start_time".to_string(),
        ));
    }
    Ok(())
}

impl CreateSessionRequest {
    pub fn validate(&self) -> Result<ValidatedCreate> {
        if !is_uuid_v4(&self.user_id) {
            return Err(CoreError::Validation("user_id must be a UUID v4".to_string()));
        }
        let start_time = timestamp_field("start_time", &self.start_time)?;
        let end_time = timestamp_field("end_time", &self.end_time)?;
        ensure_ordered(&start_time, &end_time)?;

        Ok(ValidatedCreate {
            user_id: self.user_id.clone(),
            start_time,
            end_time,
        })
    }
}

impl UpdateSessionRequest {
    pub fn validate(&self) -> Result<ValidatedUpdate> {
        Ok(ValidatedUpdate {
            end_time: timestamp_field("end_time", &self.end_time)?,
        })
    }
}

/// Session handler for business logic
pub struct SessionHandler {
    db: Arc<Database>,
}

impl SessionHandler {
    pub fn new(db: Arc<Database>) -> Self {
        SessionHandler { db }
    }

    /// Persist a new session with a server-assigned id
    pub async fn create(&self, req: ValidatedCreate) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            start_time: req.start_time,
            end_time: req.end_time,
        };

        let record = session.clone();
        self.db
            .with_conn(move |conn| store::insert_session(conn, &record))
            .await?;

        tracing::debug!("Created session {} for user {}", session.id, session.user_id);
        Ok(session)
    }

    /// Move a session's end time, either to extend it or to close it
    pub async fn extend_or_close(&self, session_id: &str, req: ValidatedUpdate) -> Result<Session> {
        let id = session_id.to_string();

        let session = self
            .db
            .with_conn(move |conn| {
                let mut session = store::get_session(conn, &id)?
                    .ok_or_else(|| CoreError::NotFound("Session", id.clone()))?;

                ensure_ordered(&session.start_time, &req.end_time)?;

                store::update_end_time(conn, &id, &req.end_time)?;
                session.end_time = req.end_time;
                Ok(session)
            })
            .await?;

        tracing::debug!("Session {} now ends at {}", session.id, session.end_time);
        Ok(session)
    }

    /// All sessions for a user; unknown users simply have none
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let user_id = user_id.to_string();
        self.db
            .with_conn(move |conn| store::list_sessions_for_user(conn, &user_id))
            .await
    }

    /// Dashboard statistics for a user as of `now`
    pub async fn user_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserStats> {
        let sessions = self.list_by_user(user_id).await?;
        Ok(stats::aggregate(&sessions, now))
    }

    /// Current-month highlights for a user as of `now`
    pub async fn user_insights(&self, user_id: &str, now: DateTime<Utc>) -> Result<MonthInsights> {
        let sessions = self.list_by_user(user_id).await?;
        Ok(stats::insights(&sessions, now))
    }
}
