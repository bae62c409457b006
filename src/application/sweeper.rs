//! Expiry sweeper - evicts participants that stopped sending heartbeats
//!
//! One sweep snapshots the clock and the participant list, then for every
//! participant older than the threshold:
//! 1. removes it, re-checking staleness inside the store,
//! 2. appends a status "left" line for it.
//!
//! Departure lines that could not be written are queued and retried first
//! thing on the next sweep. Sweeps never overlap; a sweep requested while
//! another one runs is skipped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::services::{MessageLog, PresenceRegistry};
use crate::domain::entities::Message;

/// What one sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Removed and announced
    pub evicted: Vec<String>,
    /// Stale in the snapshot but refreshed before removal
    pub spared: Vec<String>,
    /// Could not be removed, left for the next sweep
    pub failed: Vec<String>,
    /// Departure lines still waiting to be written
    pub pending_announcements: usize,
}

pub struct ExpirySweeper {
    registry: Arc<PresenceRegistry>,
    log: Arc<MessageLog>,
    stale_threshold: chrono::Duration,
    leave_text: String,
    // Held for the whole sweep, doubles as the non-overlap guard.
    pending: Mutex<Vec<Message>>,
}

impl ExpirySweeper {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        log: Arc<MessageLog>,
        stale_threshold: chrono::Duration,
        leave_text: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            log,
            stale_threshold: stale_threshold.max(chrono::Duration::zero()),
            leave_text: leave_text.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Runs one sweep, or returns `None` if another sweep is in progress.
    pub async fn sweep(&self) -> Option<SweepReport> {
        let mut pending = match self.pending.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("Sweep already running, skipping");
                return None;
            }
        };

        let mut report = SweepReport::default();
        self.flush_pending(&mut pending).await;

        let now = self.registry.now();
        let Some(cutoff) = now.checked_sub_signed(self.stale_threshold) else {
            tracing::error!("Stale threshold {} reaches before the representable range, nothing can expire", self.stale_threshold);
            report.pending_announcements = pending.len();
            return Some(report);
        };
        let snapshot = match self.registry.list().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("Sweep aborted, participant list unavailable: {}", e);
                report.pending_announcements = pending.len();
                return Some(report);
            }
        };

        for participant in snapshot.iter().filter(|p| p.is_stale(cutoff)) {
            let name = participant.name.as_str();
            match self.registry.evict_if_stale(name, cutoff).await {
                Ok(true) => {
                    tracing::info!("Participant expired: {} (last seen {})", name, participant.last_seen_at);
                    let left = Message::status(name, self.log.everyone(), &self.leave_text, now);
                    if let Err(e) = self.log.announce(&left).await {
                        tracing::error!("Departure of {} not recorded, queued for retry: {}", name, e);
                        pending.push(left);
                    }
                    report.evicted.push(name.to_string());
                }
                Ok(false) => {
                    tracing::debug!("{} refreshed during sweep, kept", name);
                    report.spared.push(name.to_string());
                }
                Err(e) => {
                    tracing::warn!("Failed to evict {}: {}", name, e);
                    report.failed.push(name.to_string());
                }
            }
        }

        report.pending_announcements = pending.len();
        if !report.evicted.is_empty() || !report.failed.is_empty() || report.pending_announcements > 0 {
            tracing::info!(
                "Sweep done: {} evicted, {} spared, {} failed, {} pending",
                report.evicted.len(),
                report.spared.len(),
                report.failed.len(),
                report.pending_announcements
            );
        }
        Some(report)
    }

    async fn flush_pending(&self, pending: &mut Vec<Message>) {
        if pending.is_empty() {
            return;
        }

        let queued = std::mem::take(pending);
        for message in queued {
            match self.log.announce(&message).await {
                Ok(()) => tracing::info!("Late departure of {} recorded", message.from),
                Err(e) => {
                    tracing::error!("Departure of {} still not recorded: {}", message.from, e);
                    pending.push(message);
                }
            }
        }
    }

    /// Starts sweeping every `interval` on the current tokio runtime.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!("Expiry sweeper started (every {:?})", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                // not raced against the stop signal: a started sweep finishes
                self.sweep().await;
            }

            tracing::info!("Expiry sweeper stopped");
        });

        SweeperHandle { stop: stop_tx, task }
    }
}

/// Controls a spawned sweeper
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the timer and waits for an in-flight sweep to complete.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        let _ = self.stop.send(true);
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
