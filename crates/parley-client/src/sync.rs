//! Background delta polling with tokio mpsc command pattern.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::SyncCoordinator;

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

/// Commands sent *into* the sync task.
#[derive(Debug)]
pub enum SyncCommand {
    /// Skip the current wait and sync right away.
    SyncNow,
    /// Stop the loop, abandoning a pass that is still in flight.
    Shutdown,
}

/// Handle to a running sync loop.
pub struct SyncHandle {
    cmd_tx: mpsc::Sender<SyncCommand>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Ask for an immediate pass. Ignored if the loop has stopped.
    pub fn sync_now(&self) {
        if self.cmd_tx.try_send(SyncCommand::SyncNow).is_err() {
            debug!("sync loop busy or stopped, sync request dropped");
        }
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) {
        if self.cmd_tx.send(SyncCommand::Shutdown).await.is_err() {
            debug!("sync loop already stopped");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "sync task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

fn stopping(requested: bool) {
    if requested {
        info!("sync loop shutdown requested");
    } else {
        info!("command channel closed, stopping sync loop");
    }
}

impl SyncCoordinator {
    /// Keep local state in step with the remote until shut down.
    ///
    /// Each pass re-opens the delta stream from the current checkpoint.
    /// Between passes the loop waits `catch_up_interval` while the remote
    /// reports more pages, `poll_interval` once it is caught up, and
    /// `retry_interval` after a failure.
    pub fn spawn_sync_loop(&self) -> SyncHandle {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<SyncCommand>(16);
        let coordinator = self.clone();

        let task = tokio::spawn(async move {
            info!("sync loop started");

            loop {
                // A pass that is still waiting on the remote is dropped on
                // shutdown. Batches already applied stay committed.
                let pass = coordinator.next_delay();
                tokio::pin!(pass);
                let delay = loop {
                    tokio::select! {
                        delay = &mut pass => break Some(delay),
                        cmd = cmd_rx.recv() => match cmd {
                            Some(SyncCommand::SyncNow) => {
                                debug!("sync already running, request coalesced");
                            }
                            other => {
                                stopping(other.is_some());
                                break None;
                            }
                        },
                    }
                };
                let Some(delay) = delay else { break };

                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(SyncCommand::SyncNow) => {
                            debug!("immediate sync requested");
                        }
                        other => {
                            stopping(other.is_some());
                            break;
                        }
                    },
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            info!("sync loop terminated");
        });

        SyncHandle { cmd_tx, task }
    }

    /// Run one pass and pick the wait before the next one.
    async fn next_delay(&self) -> Duration {
        let config = self.config();
        match self.sync_once().await {
            Ok(outcome) if outcome.has_more_changes => {
                debug!(batches = outcome.batches, "remote has more changes");
                config.catch_up_interval
            }
            Ok(outcome) => {
                debug!(batches = outcome.batches, checkpoint = ?outcome.checkpoint, "caught up");
                config.poll_interval
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in_ms = config.retry_interval.as_millis() as u64,
                    "sync pass failed, backing off"
                );
                config.retry_interval
            }
        }
    }
}
