//! The update scheduler and its actor handle.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use crate::{UpdateConfig, UpdateError, UpdateRegistry};

/// What one pass over the hooks did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Hooks that returned `true`; their timers were reset.
    pub completed: Vec<String>,
    /// Hooks that returned `false`.
    pub deferred: Vec<String>,
    /// Hooks that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Runs every registered [`OnUpdate`](crate::OnUpdate) hook on a fixed
/// interval.
///
/// Each hook keeps its own last-run instant. A hook that returns `false`
/// or fails keeps its old instant, so the next pass reports a larger
/// elapsed time.
pub struct UpdateScheduler {
    config: UpdateConfig,
    registry: Arc<UpdateRegistry>,
    last_run: Vec<Instant>,
}

impl UpdateScheduler {
    /// Creates a scheduler. Every hook's timer starts now.
    pub fn new(config: UpdateConfig, registry: Arc<UpdateRegistry>) -> Self {
        let config = config.validated();
        let now = Instant::now();
        let last_run = vec![now; registry.len()];
        Self {
            config,
            registry,
            last_run,
        }
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Calls every hook once, in registration order.
    pub async fn run_once(&mut self) -> UpdateReport {
        let mut report = UpdateReport::default();
        let now = Instant::now();

        for (hook, last_run) in self.registry.hooks().iter().zip(self.last_run.iter_mut()) {
            let name = hook.name().to_string();
            let elapsed = now.saturating_duration_since(*last_run).as_secs();

            match hook.on_update(elapsed).await {
                Ok(true) => {
                    trace!(hook = %name, elapsed, "update hook completed");
                    *last_run = now;
                    report.completed.push(name);
                }
                Ok(false) => {
                    trace!(hook = %name, elapsed, "update hook deferred");
                    report.deferred.push(name);
                }
                Err(err) => {
                    error!(hook = %name, elapsed, "update hook failed: {err:?}");
                    report.failed.push((name, err.to_string()));
                }
            }
        }

        report
    }

    /// Moves the scheduler onto its own task.
    ///
    /// The first pass runs one interval after the call. Passes that fall
    /// behind are skipped rather than bunched up.
    pub fn spawn(self) -> UpdateHandle {
        let (sender, receiver) = mpsc::channel(8);
        tokio::spawn(self.run(receiver));
        UpdateHandle { sender }
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<UpdateCommand>) {
        let period = self.config.interval();
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(hooks = self.registry.len(), interval_secs = self.config.interval_secs, "update scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.run_once().await;
                    debug!(
                        completed = report.completed.len(),
                        deferred = report.deferred.len(),
                        failed = report.failed.len(),
                        "update pass finished"
                    );
                }
                cmd = receiver.recv() => match cmd {
                    Some(UpdateCommand::RunNow { reply }) => {
                        let _ = reply.send(self.run_once().await);
                    }
                    Some(UpdateCommand::Shutdown) | None => break,
                },
            }
        }

        info!("update scheduler stopped");
    }
}

enum UpdateCommand {
    RunNow {
        reply: oneshot::Sender<UpdateReport>,
    },
    Shutdown,
}

/// Handle to a spawned [`UpdateScheduler`]. Cheap to clone.
///
/// Dropping every handle stops the scheduler too.
#[derive(Clone)]
pub struct UpdateHandle {
    sender: mpsc::Sender<UpdateCommand>,
}

impl UpdateHandle {
    /// Runs a pass immediately and waits for its report.
    pub async fn run_now(&self) -> Result<UpdateReport, UpdateError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(UpdateCommand::RunNow { reply: reply_tx })
            .await
            .map_err(|_| UpdateError::Unavailable)?;
        reply_rx.await.map_err(|_| UpdateError::Unavailable)
    }

    /// Stops the scheduler after its current pass.
    pub async fn shutdown(&self) -> Result<(), UpdateError> {
        self.sender
            .send(UpdateCommand::Shutdown)
            .await
            .map_err(|_| UpdateError::Unavailable)
    }

    /// Whether the scheduler task is still running.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
