//! Meet session tracker
//!
//! Samples open browser tabs on a fixed interval and reports session
//! boundaries to the sessions API. One task owns the tracker, so ticks never
//! overlap.

pub mod client;
pub mod lifecycle;
pub mod probe;
pub mod state;
pub mod status;

pub use client::{HttpSessionApi, SessionApi};
pub use lifecycle::{SessionTracker, Transition};
pub use probe::{ActivityProbe, DevToolsProbe};
pub use state::{StateFile, TrackerState};

use crate::config::Config;
use crate::error::Result;
use crate::shutdown::shutdown_signal;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Run the tracker until a shutdown signal arrives
pub async fn run_tracker(config: &Config) -> Result<()> {
    let state_file = StateFile::new(config.tracker_state_path());
    let state = state_file.load_or_init()?;

    tracing::info!(
        "Tracking Meet tabs for user {} (every {}s, reporting to {})",
        state.user_id,
        config.tracker.check_interval_secs,
        config.tracker.api_url
    );

    let api = HttpSessionApi::new(&config.tracker)?;
    let probe = DevToolsProbe::new(&config.tracker)?;
    let tracker = SessionTracker::new(api, probe, state).with_state_file(state_file);

    let period = Duration::from_secs(config.tracker.check_interval_secs.max(1));
    run_loop(tracker, period, shutdown_signal()).await;

    tracing::info!("Tracker stopped");
    Ok(())
}

/// Tick `tracker` every `period` until `shutdown` resolves.
///
/// The first tick fires immediately. Returns the tracker so callers can
/// inspect its final state.
pub async fn run_loop<A, P, F>(
    mut tracker: SessionTracker<A, P>,
    period: Duration,
    shutdown: F,
) -> SessionTracker<A, P>
where
    A: SessionApi,
    P: ActivityProbe,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                match tracker.tick(chrono::Utc::now()).await {
                    Transition::Unchanged => tracing::trace!("No Meet tabs, nothing to do"),
                    Transition::Failed(_) => {}
                    transition => tracing::debug!("Tracker transition: {:?}", transition),
                }
            }
        }
    }

    tracker
}
