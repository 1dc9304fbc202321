use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::machine::{SessionError, SessionId, TickOutcome};
use crate::config::SessionConfig;

/// Owner of the session a ticker advances.
#[async_trait]
pub trait ProgressDriver: Send + Sync + 'static {
    /// Apply one increment to the session.
    fn advance(&self, session: &SessionId, increment: u8) -> Result<TickOutcome, SessionError>;

    /// Called exactly once, after the session has already moved to resolved.
    async fn resolved(&self, session: &SessionId);
}

/// Fixed-cadence progress task for one processing session.
///
/// The first increment lands one interval after spawning. Once the final tick
/// lands, the same task runs [`ProgressDriver::resolved`] to completion, so
/// only abort a ticker whose session is still processing.
#[derive(Debug)]
pub struct ProgressTicker {
    session: SessionId,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn spawn<D: ProgressDriver>(
        session: SessionId,
        config: SessionConfig,
        driver: Arc<D>,
    ) -> Self {
        let id = session.clone();
        let handle = tokio::spawn(async move {
            // A zero period would make `interval` panic.
            let period = config.tick_interval.max(Duration::from_millis(1));
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // `interval` yields immediately on the first call.
            interval.tick().await;

            loop {
                interval.tick().await;
                match driver.advance(&id, config.progress_increment) {
                    Ok(TickOutcome::Advanced { progress }) => {
                        debug!(session = %id, progress, "session progress");
                    }
                    Ok(TickOutcome::Resolved) => {
                        debug!(session = %id, "session resolved");
                        driver.resolved(&id).await;
                        break;
                    }
                    Err(error) => {
                        warn!(session = %id, %error, "progress ticker stopped");
                        break;
                    }
                }
            }
        });

        Self { session, handle }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the ticker to reach resolution (or be aborted).
    pub async fn join(self) -> Result<(), JoinError> {
        self.handle.await
    }
}
