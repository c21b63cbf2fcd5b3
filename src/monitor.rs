// MIT License - Copyright (c) 2026 Peter Wright
// Monitor loop

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::catalog::PointDirectory;
use crate::config::{MonitorConfig, Passcode};
use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_DELAY};
use crate::diff::{detect, Snapshot};
use crate::error::{FacpError, Result};
use crate::event::TransitionSink;
use crate::point::PointStatus;
use crate::session::Session;
use crate::transport::PanelLink;

/// Bounded re-login policy with exponential backoff.
///
/// The first attempt is immediate; attempt `n > 1` waits
/// `base_delay * 2^(n-2)`, doubling at most four times and never more than
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: base_delay.saturating_mul(16),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before re-login attempt `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (attempt - 2).min(4);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Authenticating,
    Polling,
}

/// Why [`Monitor::run`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// A stop was requested through a [`MonitorHandle`].
    Stopped,
}

/// Cloneable control handle for a running monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
}

impl MonitorHandle {
    /// Ask the monitor to stop. Observed between polls, and during the
    /// inter-poll sleep.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// The last successfully polled snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait for the next successful poll. `None` once the monitor is gone.
    pub async fn next_snapshot(&mut self) -> Option<Arc<Snapshot>> {
        self.snapshot_rx.changed().await.ok()?;
        Some(self.snapshot_rx.borrow_and_update().clone())
    }
}

/// Polls the panel on a fixed interval and reports point transitions.
///
/// Starts in [`MonitorState::Authenticating`]. A rejected initial login is
/// fatal. After that, any failed poll triggers re-login under the
/// [`RetryPolicy`]; only exhausting it ends the loop with an error. The last
/// good snapshot survives failed polls, so the first poll after recovery is
/// diffed against it.
pub struct Monitor<L, D> {
    session: Session<L>,
    directory: D,
    passcode: Passcode,
    poll_interval: Duration,
    retry: RetryPolicy,
    state: MonitorState,
    previous: Arc<Snapshot>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
}

impl<L: PanelLink, D: PointDirectory> Monitor<L, D> {
    pub fn new(session: Session<L>, directory: D, passcode: Passcode) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let previous = Arc::new(Snapshot::new());
        let (snapshot_tx, _) = watch::channel(Arc::clone(&previous));
        Self {
            session,
            directory,
            passcode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            state: MonitorState::Authenticating,
            previous,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            snapshot_tx,
        }
    }

    /// Build a monitor over `link` with timeouts and policies from `config`.
    pub fn from_config(link: L, directory: D, config: &MonitorConfig) -> Self {
        let session =
            Session::new(link).with_timeouts(config.command_timeout, config.list_timeout);
        Self::new(session, directory, config.passcode.clone())
            .with_poll_interval(config.poll_interval)
            .with_retry_policy(config.retry_policy())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            shutdown_tx: Arc::clone(&self.shutdown_tx),
            snapshot_rx: self.snapshot_tx.subscribe(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// The snapshot the next poll will be diffed against.
    pub fn previous(&self) -> Arc<Snapshot> {
        Arc::clone(&self.previous)
    }

    pub fn session(&self) -> &Session<L> {
        &self.session
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Log in, then poll until stopped.
    pub async fn run<S: TransitionSink>(&mut self, sink: &mut S) -> Result<MonitorExit> {
        self.state = MonitorState::Authenticating;
        match self.session.login(&self.passcode).await {
            Ok(true) => {}
            Ok(false) => {
                error!("Initial login rejected");
                return Err(FacpError::AuthenticationFailed);
            }
            Err(e) => {
                error!("Initial login failed: {}", e);
                return Err(e);
            }
        }

        self.state = MonitorState::Polling;
        info!(
            "Starting monitoring loop (interval {:.1}s)",
            self.poll_interval.as_secs_f64()
        );

        while !self.stop_requested() {
            if let Err(e) = self.poll_once(sink).await {
                if e.is_link_error() {
                    warn!(kind = e.kind(), "Poll failed: {}", e);
                } else {
                    error!(kind = e.kind(), "Poll failed: {}", e);
                }
                self.recover().await?;
                continue;
            }

            if self.wait_or_stop(self.poll_interval).await {
                break;
            }
        }

        info!("Monitoring stopped");
        Ok(MonitorExit::Stopped)
    }

    /// Run a single poll: list points, diff against the previous snapshot
    /// and emit transitions. Returns the number of transitions emitted.
    ///
    /// On error nothing is emitted and the previous snapshot is kept.
    pub async fn poll_once<S: TransitionSink>(&mut self, sink: &mut S) -> Result<usize> {
        let rows = self.session.list_points().await?;
        let observed_at = Utc::now();

        let current: Snapshot = rows
            .iter()
            .filter_map(|row| match PointStatus::from_raw(row, observed_at) {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("Skipping point: {}", e);
                    None
                }
            })
            .collect();

        for status in &current {
            self.directory
                .record_status(&status.point_id, &status.status_code, observed_at);
        }

        let transitions = detect(&self.previous, &current, observed_at);
        for transition in &transitions {
            let details = self.directory.describe(transition.point_id());
            sink.emit(transition, details.as_ref());
        }
        debug!(
            "Poll complete: {} points, {} transitions",
            current.len(),
            transitions.len()
        );

        let current = Arc::new(current);
        self.previous = Arc::clone(&current);
        self.snapshot_tx.send_replace(current);
        Ok(transitions.len())
    }

    /// Re-login under the retry policy.
    async fn recover(&mut self) -> Result<()> {
        self.state = MonitorState::Authenticating;
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                info!(
                    "Re-login attempt {} of {} in {:.1}s",
                    attempt,
                    attempts,
                    delay.as_secs_f64()
                );
                if self.wait_or_stop(delay).await {
                    return Ok(());
                }
            }

            match self.session.login(&self.passcode).await {
                Ok(true) => {
                    info!("Session recovered after {} attempt(s)", attempt);
                    self.state = MonitorState::Polling;
                    return Ok(());
                }
                Ok(false) => warn!("Re-login attempt {} rejected", attempt),
                Err(e) => warn!(kind = e.kind(), "Re-login attempt {} failed: {}", attempt, e),
            }
        }

        error!("Failed to re-login after {} attempts", attempts);
        Err(FacpError::RecoveryExhausted { attempts })
    }

    /// Best-effort logout. Errors are logged, not returned.
    pub async fn close(&mut self) {
        if let Err(e) = self.session.logout().await {
            warn!("Logout failed: {}", e);
        }
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Sleep for `duration`; returns true if a stop was requested.
    async fn wait_or_stop(&mut self, duration: Duration) -> bool {
        if self.stop_requested() {
            return true;
        }
        tokio::select! {
            _ = sleep(duration) => false,
            _ = self.shutdown_rx.wait_for(|&stop| stop) => true,
        }
    }
}
