//! Serving-loop supervisor
//!
//! Starts the server, and whenever it dies (error or panic) waits for the
//! restart policy, clears the stale credential artifact, and starts it again.
//! A clean return from the server ends supervision.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::credential::remove_stale_artifact;

pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Decides whether (and after how long) to restart after the n-th fault.
pub trait RestartPolicy: Send + Sync {
    /// `restarts` counts faults so far, starting at 1. `None` stops supervision.
    fn next_delay(&self, restarts: u64) -> Option<Duration>;
}

/// Restart forever after a constant delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RESTART_DELAY)
    }
}

impl RestartPolicy for FixedDelay {
    fn next_delay(&self, _restarts: u64) -> Option<Duration> {
        Some(self.delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Restarting,
}

pub struct Supervisor<P> {
    policy: P,
    artifact_path: Option<PathBuf>,
}

impl<P: RestartPolicy> Supervisor<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            artifact_path: None,
        }
    }

    /// Credential file to delete before every (re)start.
    pub fn with_artifact_cleanup(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    fn cleanup(&self) {
        let Some(path) = &self.artifact_path else {
            return;
        };
        if let Err(e) = remove_stale_artifact(path) {
            warn!("Startup cleanup failed: {:#}", e);
        }
    }

    /// Run `start` under supervision.
    ///
    /// Each incarnation is spawned on its own task so a panic is observed as a
    /// fault instead of unwinding through the supervisor. Returns the number of
    /// restarts performed once the server exits cleanly, or the last fault once
    /// the policy declines to restart.
    pub async fn run<F, Fut>(&self, mut start: F) -> Result<u64>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut restarts: u64 = 0;

        loop {
            self.cleanup();
            info!(state = ?SupervisorState::Running, restarts, "Starting serving loop");

            let fault = match tokio::spawn(start()).await {
                Ok(Ok(())) => {
                    info!(restarts, "Serving loop stopped cleanly");
                    return Ok(restarts);
                }
                Ok(Err(e)) => e,
                Err(join) if join.is_panic() => anyhow!("Serving loop panicked: {}", join),
                Err(join) => anyhow!("Serving loop task aborted: {}", join),
            };

            restarts += 1;
            let Some(delay) = self.policy.next_delay(restarts) else {
                error!(restarts, "Restart policy exhausted: {:#}", fault);
                return Err(fault.context("Serving loop failed and will not be restarted"));
            };

            error!(
                state = ?SupervisorState::Restarting,
                restarts,
                delay_ms = delay.as_millis() as u64,
                "🔁 Serving loop crashed, restarting: {:#}",
                fault
            );
            sleep(delay).await;
        }
    }
}
