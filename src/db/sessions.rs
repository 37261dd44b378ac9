//! Session store queries
//!
//! Plain functions over a borrowed connection; callers decide whether they
//! run inline or through [`Database::with_conn`](super::Database::with_conn).

use crate::error::Result;
use crate::model::{format_timestamp, parse_timestamp, Session};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

const SESSION_COLUMNS: &str = "id, user_id, start_time, end_time";

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        start_time: timestamp_column(row, 2)?,
        end_time: timestamp_column(row, 3)?,
    })
}

/// Insert a new session record
pub fn insert_session(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, start_time, end_time) VALUES (?, ?, ?, ?)",
        params![
            session.id,
            session.user_id,
            format_timestamp(&session.start_time),
            format_timestamp(&session.end_time),
        ],
    )?;
    Ok(())
}

/// Look up a session by id
pub fn get_session(conn: &Connection, id: &str) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"),
            [id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// Replace a session's end time. Returns the number of rows touched (0 or 1).
pub fn update_end_time(conn: &Connection, id: &str, end_time: &DateTime<Utc>) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE sessions SET end_time = ? WHERE id = ?",
        params![format_timestamp(end_time), id],
    )?;
    Ok(changed)
}

/// All sessions for a user, oldest first (insertion order on equal start times)
pub fn list_sessions_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions
         WHERE user_id = ?
         ORDER BY start_time ASC, rowid ASC"
    ))?;

    let sessions = stmt
        .query_map([user_id], row_to_session)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(sessions)
}
