//! Session lifecycle state machine
//!
//! Turns the sampled "Meet tab open" signal into create / extend / close
//! calls. The tracker owns its state; nothing else mutates it.
//!
//! | phase | signal | call                 | next phase            |
//! |-------|--------|----------------------|-----------------------|
//! | Idle  | yes    | create(now, now)     | Open (on success)     |
//! | Open  | yes    | update(id, now)      | Open                  |
//! | Open  | no     | update(id, now)      | Idle (on success)     |
//! | Idle  | no     | none                 | Idle                  |
//!
//! API failures are logged and not retried; the next tick is the only
//! recovery path.

use super::client::SessionApi;
use super::probe::ActivityProbe;
use super::state::{OpenSession, StateFile, TrackerPhase, TrackerState};
use chrono::{DateTime, Utc};

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new session was created
    Started(String),
    /// The open session's end time moved forward
    Extended(String),
    /// The open session received its final end time
    Closed(String),
    /// Idle and nothing observed
    Unchanged,
    /// A probe or API call failed; state was left as it was
    Failed(String),
}

pub struct SessionTracker<A, P> {
    api: A,
    probe: P,
    state: TrackerState,
    state_file: Option<StateFile>,
}

impl<A: SessionApi, P: ActivityProbe> SessionTracker<A, P> {
    pub fn new(api: A, probe: P, state: TrackerState) -> Self {
        SessionTracker {
            api,
            probe,
            state,
            state_file: None,
        }
    }

    /// Persist state changes to `file`
    pub fn with_state_file(mut self, file: StateFile) -> Self {
        self.state_file = Some(file);
        self
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Sample the probe once and apply the resulting transition
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Transition {
        match self.probe.is_active().await {
            Ok(active) => self.apply(active, now).await,
            Err(e) => {
                tracing::warn!("Error checking Meet tabs: {}", e);
                Transition::Failed(e.to_string())
            }
        }
    }

    /// Apply one observation of the signal
    pub async fn apply(&mut self, active: bool, now: DateTime<Utc>) -> Transition {
        let open = self.state.open_session().cloned();

        match (open, active) {
            (None, false) => Transition::Unchanged,
            (None, true) => self.start(now).await,
            (Some(open), true) => match self.api.update_session(&open.session_id, now).await {
                Ok(_) => {
                    tracing::debug!("Session updated: {} end_time: {}", open.session_id, now);
                    Transition::Extended(open.session_id)
                }
                Err(e) => {
                    tracing::warn!("Error updating session {}: {}", open.session_id, e);
                    Transition::Failed(e.to_string())
                }
            },
            (Some(open), false) => match self.api.update_session(&open.session_id, now).await {
                Ok(_) => {
                    self.set_phase(TrackerPhase::Idle);
                    tracing::info!("Session ended: {}", open.session_id);
                    Transition::Closed(open.session_id)
                }
                Err(e) => {
                    tracing::warn!("Error ending session {}: {}", open.session_id, e);
                    Transition::Failed(e.to_string())
                }
            },
        }
    }

    async fn start(&mut self, now: DateTime<Utc>) -> Transition {
        match self.api.create_session(&self.state.user_id, now, now).await {
            Ok(session) => {
                tracing::info!("New session started: {}", session.id);
                self.set_phase(TrackerPhase::Open(OpenSession {
                    session_id: session.id.clone(),
                    started_at: session.start_time,
                }));
                Transition::Started(session.id)
            }
            Err(e) => {
                tracing::warn!("Error starting new session: {}", e);
                Transition::Failed(e.to_string())
            }
        }
    }

    fn set_phase(&mut self, phase: TrackerPhase) {
        self.state.phase = phase;
        if let Some(file) = &self.state_file {
            if let Err(e) = file.save(&self.state) {
                tracing::warn!("Failed to save tracker state to {}: {}", file.path().display(), e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{CoreError, Result};
    use crate::model::Session;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Create { user_id: String, start: DateTime<Utc>, end: DateTime<Utc> },
        Update { id: String, end: DateTime<Utc> },
    }

    /// Records calls; fails every call while `offline` is set
    #[derive(Clone, Default)]
    pub struct FakeApi {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub offline: Arc<AtomicBool>,
        next_id: Arc<Mutex<u32>>,
    }

    impl FakeApi {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn check_online(&self) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(CoreError::Network("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionApi for FakeApi {
        async fn create_session(
            &self,
            user_id: &str,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
        ) -> Result<Session> {
            self.calls.lock().unwrap().push(Call::Create {
                user_id: user_id.to_string(),
                start: start_time,
                end: end_time,
            });
            self.check_online()?;

            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            Ok(Session {
                id: format!("session-{}", next_id),
                user_id: user_id.to_string(),
                start_time,
                end_time,
            })
        }

        async fn update_session(&self, session_id: &str, end_time: DateTime<Utc>) -> Result<Session> {
            self.calls.lock().unwrap().push(Call::Update {
                id: session_id.to_string(),
                end: end_time,
            });
            self.check_online()?;

            Ok(Session {
                id: session_id.to_string(),
                user_id: "user".to_string(),
                start_time: end_time,
                end_time,
            })
        }
    }

    /// Replays a fixed sequence of signals, then reports inactive
    #[derive(Clone, Default)]
    pub struct ScriptedProbe {
        signals: Arc<Mutex<VecDeque<Result<bool>>>>,
    }

    impl ScriptedProbe {
        pub fn new(signals: impl IntoIterator<Item = bool>) -> Self {
            ScriptedProbe {
                signals: Arc::new(Mutex::new(signals.into_iter().map(Ok).collect())),
            }
        }

        pub fn push_error(&self) {
            self.signals
                .lock()
                .unwrap()
                .push_back(Err(CoreError::Network("devtools unreachable".into())));
        }
    }

    #[async_trait]
    impl ActivityProbe for ScriptedProbe {
        async fn is_active(&self) -> Result<bool> {
            self.signals.lock().unwrap().pop_front().unwrap_or(Ok(false))
        }
    }

    fn state() -> TrackerState {
        TrackerState {
            user_id: "user-1".to_string(),
            phase: TrackerPhase::Idle,
        }
    }

    fn minute(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() + Duration::minutes(n)
    }

    #[tokio::test]
    async fn test_open_extend_close() {
        let api = FakeApi::default();
        let probe = ScriptedProbe::new([true, true, false]);
        let mut tracker = SessionTracker::new(api.clone(), probe, state());

        assert_eq!(tracker.tick(minute(0)).await, Transition::Started("session-1".into()));
        assert_eq!(tracker.tick(minute(1)).await, Transition::Extended("session-1".into()));
        assert_eq!(tracker.tick(minute(2)).await, Transition::Closed("session-1".into()));
        assert_eq!(tracker.state().phase, TrackerPhase::Idle);

        assert_eq!(
            api.calls(),
            vec![
                Call::Create { user_id: "user-1".into(), start: minute(0), end: minute(0) },
                Call::Update { id: "session-1".into(), end: minute(1) },
                Call::Update { id: "session-1".into(), end: minute(2) },
            ]
        );
    }

    #[tokio::test]
    async fn test_idle_without_signal_makes_no_calls() {
        let api = FakeApi::default();
        let mut tracker = SessionTracker::new(api.clone(), ScriptedProbe::new([false]), state());

        assert_eq!(tracker.tick(minute(0)).await, Transition::Unchanged);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_stays_idle() {
        let api = FakeApi::default();
        api.offline.store(true, Ordering::SeqCst);
        let mut tracker = SessionTracker::new(api.clone(), ScriptedProbe::new([true, true]), state());

        assert!(matches!(tracker.tick(minute(0)).await, Transition::Failed(_)));
        assert_eq!(tracker.state().phase, TrackerPhase::Idle);

        // Next sample tries again with a fresh create
        api.offline.store(false, Ordering::SeqCst);
        assert_eq!(tracker.tick(minute(1)).await, Transition::Started("session-1".into()));
    }

    #[tokio::test]
    async fn test_failed_close_keeps_session_open() {
        let api = FakeApi::default();
        let mut tracker = SessionTracker::new(api.clone(), ScriptedProbe::new([true, false, false]), state());

        tracker.tick(minute(0)).await;
        api.offline.store(true, Ordering::SeqCst);
        assert!(matches!(tracker.tick(minute(1)).await, Transition::Failed(_)));
        assert_eq!(tracker.state().open_session().unwrap().session_id, "session-1");

        api.offline.store(false, Ordering::SeqCst);
        assert_eq!(tracker.tick(minute(2)).await, Transition::Closed("session-1".into()));
    }

    #[tokio::test]
    async fn test_failed_extend_stays_open() {
        let api = FakeApi::default();
        let mut tracker = SessionTracker::new(api.clone(), ScriptedProbe::new([true, true]), state());

        tracker.tick(minute(0)).await;
        api.offline.store(true, Ordering::SeqCst);
        assert!(matches!(tracker.tick(minute(1)).await, Transition::Failed(_)));
        assert!(tracker.state().open_session().is_some());
    }

    #[tokio::test]
    async fn test_probe_error_is_noop() {
        let api = FakeApi::default();
        let probe = ScriptedProbe::new(Vec::new());
        probe.push_error();
        let mut tracker = SessionTracker::new(api.clone(), probe, state());

        assert!(matches!(tracker.tick(minute(0)).await, Transition::Failed(_)));
        assert!(api.calls().is_empty());
        assert_eq!(tracker.state().phase, TrackerPhase::Idle);
    }

    #[tokio::test]
    async fn test_transitions_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        let api = FakeApi::default();
        let mut tracker = SessionTracker::new(api, ScriptedProbe::new([true, false]), state())
            .with_state_file(StateFile::new(path.clone()));

        tracker.tick(minute(0)).await;
        let saved = StateFile::new(path.clone()).load().unwrap().unwrap();
        assert_eq!(
            saved.phase,
            TrackerPhase::Open(OpenSession {
                session_id: "session-1".into(),
                started_at: minute(0),
            })
        );

        tracker.tick(minute(1)).await;
        let saved = StateFile::new(path).load().unwrap().unwrap();
        assert_eq!(saved.phase, TrackerPhase::Idle);
        assert_eq!(saved.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_resumes_open_session_from_state() {
        let api = FakeApi::default();
        let resumed = TrackerState {
            user_id: "user-1".into(),
            phase: TrackerPhase::Open(OpenSession {
                session_id: "old".into(),
                started_at: minute(-30),
            }),
        };
        let mut tracker = SessionTracker::new(api.clone(), ScriptedProbe::new([true]), resumed);

        assert_eq!(tracker.tick(minute(0)).await, Transition::Extended("old".into()));
        assert_eq!(api.calls(), vec![Call::Update { id: "old".into(), end: minute(0) }]);
    }
}
