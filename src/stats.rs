//! Session statistics for the dashboard
//!
//! Everything here is a pure function of a user's sessions and the current
//! time. Month and year partitions, daily buckets and ISO weeks are all
//! evaluated in UTC.

use crate::model::Session;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Number of sessions returned in `recentSessions`
pub const RECENT_SESSIONS_LIMIT: usize = 10;

/// Count and summed duration (ms) of a group of sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub count: i64,
    pub duration: i64,
}

impl PeriodStats {
    fn add(&mut self, duration: i64) {
        self.count += 1;
        self.duration += duration;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_sessions: i64,
    /// Milliseconds
    pub total_duration: i64,
    /// Milliseconds, rounded to the nearest integer
    pub avg_duration: i64,
    pub this_month: PeriodStats,
    pub this_year: PeriodStats,
}

/// Per-UTC-date bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    /// `YYYY-MM-DD`
    pub date: String,
    pub session_count: i64,
    pub duration: i64,
}

/// A session annotated with its computed duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSession {
    pub id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
}

impl From<&Session> for RecentSession {
    fn from(session: &Session) -> Self {
        RecentSession {
            id: session.id.clone(),
            user_id: session.user_id.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            duration: session.duration_ms(),
        }
    }
}

/// Aggregated statistics for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub summary: Summary,
    pub daily_stats: Vec<DailyStat>,
    pub recent_sessions: Vec<RecentSession>,
}

impl UserStats {
    /// The shape returned for a user without sessions
    pub fn empty() -> Self {
        UserStats::default()
    }
}

/// Aggregate a user's sessions (in store order) as of `now`.
pub fn aggregate(sessions: &[Session], now: DateTime<Utc>) -> UserStats {
    if sessions.is_empty() {
        return UserStats::empty();
    }

    let mut total_duration = 0i64;
    let mut this_month = PeriodStats::default();
    let mut this_year = PeriodStats::default();
    let mut daily: BTreeMap<NaiveDate, PeriodStats> = BTreeMap::new();

    for session in sessions {
        let duration = session.duration_ms();
        let start = session.start_time;

        total_duration += duration;

        if start.year() == now.year() {
            this_year.add(duration);
            if start.month() == now.month() {
                this_month.add(duration);
            }
        }

        daily.entry(start.date_naive()).or_default().add(duration);
    }

    let total_sessions = sessions.len() as i64;
    let avg_duration = (total_duration as f64 / total_sessions as f64).round() as i64;

    let daily_stats = daily
        .into_iter()
        .map(|(date, stats)| DailyStat {
            date: date.format("%Y-%m-%d").to_string(),
            session_count: stats.count,
            duration: stats.duration,
        })
        .collect();

    UserStats {
        summary: Summary {
            total_sessions,
            total_duration,
            avg_duration,
            this_month,
            this_year,
        },
        daily_stats,
        recent_sessions: recent_sessions(sessions, RECENT_SESSIONS_LIMIT),
    }
}

/// The `limit` most recent sessions by start time, newest first.
///
/// The sort is stable, so sessions sharing a start time keep their store order.
pub fn recent_sessions(sessions: &[Session], limit: usize) -> Vec<RecentSession> {
    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    ordered
        .into_iter()
        .take(limit)
        .map(RecentSession::from)
        .collect()
}

// ============================================================================
// Month insights
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongestSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusiestDay {
    pub date: String,
    pub duration: i64,
}

/// Highlights of the current month, compared with the previous one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthInsights {
    pub longest_session: Option<LongestSession>,
    pub busiest_day: Option<BusiestDay>,
    /// Sessions per active ISO week this month, rounded
    pub avg_per_week: i64,
    pub current_month: PeriodStats,
    pub previous_month: PeriodStats,
}

fn previous_month(now: DateTime<Utc>) -> (i32, u32) {
    if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    }
}

/// Compute month insights as of `now`.
pub fn insights(sessions: &[Session], now: DateTime<Utc>) -> MonthInsights {
    let (prev_year, prev_month) = previous_month(now);

    let mut current_month = PeriodStats::default();
    let mut previous = PeriodStats::default();
    let mut longest: Option<&Session> = None;
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut weeks = HashSet::new();

    for session in sessions {
        let start = session.start_time;
        let duration = session.duration_ms();

        if start.year() == prev_year && start.month() == prev_month {
            previous.add(duration);
        }
        if start.year() != now.year() || start.month() != now.month() {
            continue;
        }

        current_month.add(duration);
        *per_day.entry(start.date_naive()).or_insert(0) += duration;

        let week = start.iso_week();
        weeks.insert((week.year(), week.week()));

        if longest.map_or(true, |best| duration > best.duration_ms()) {
            longest = Some(session);
        }
    }

    let busiest_day = per_day
        .into_iter()
        .fold(None::<(NaiveDate, i64)>, |best, (date, total)| match best {
            Some((_, best_total)) if best_total >= total => best,
            _ => Some((date, total)),
        })
        .map(|(date, duration)| BusiestDay {
            date: date.format("%Y-%m-%d").to_string(),
            duration,
        });

    let avg_per_week = if weeks.is_empty() {
        0
    } else {
        (current_month.count as f64 / weeks.len() as f64).round() as i64
    };

    MonthInsights {
        longest_session: longest.map(|s| LongestSession {
            id: s.id.clone(),
            start_time: s.start_time,
            duration: s.duration_ms(),
        }),
        busiest_day,
        avg_per_week,
        current_month,
        previous_month: previous,
    }
}
