//! Human-readable tracker status for `meetime --status`

use super::state::TrackerState;
use chrono::{DateTime, Utc};

/// `1h 2m 3s`, `2m 3s` or `3s`
pub fn format_elapsed(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn status_report(state: &TrackerState, now: DateTime<Utc>, dashboard_url: Option<&str>) -> String {
    let mut lines = vec![format!("User ID:   {}", state.user_id)];

    match state.open_session() {
        Some(open) => {
            let elapsed = (now - open.started_at).num_milliseconds();
            lines.push("Status:    Meeting Active".to_string());
            lines.push(format!("Session:   {}", open.session_id));
            lines.push(format!("Duration:  {}", format_elapsed(elapsed)));
        }
        None => lines.push("Status:    No Active Meeting".to_string()),
    }

    if let Some(base) = dashboard_url {
        lines.push(format!(
            "Dashboard: {}/{}",
            base.trim_end_matches('/'),
            state.user_id
        ));
    }

    lines.join("\n")
}
