//! LifecycleSweeper - Background service that warns, times out and closes
//! idle conversations.
//!
//! Every tick it lists the open conversations and, for each one:
//! 1. Claims it for this worker (skips it if another worker holds a claim)
//! 2. Takes the subject lock and reloads it, so it never races a live turn
//! 3. Evaluates and applies the due lifecycle step
//! 4. Releases the claim
//!
//! A failure on one conversation is logged and counted; the sweep goes on.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 1h | Time between sweeps |
//! | `lease` | 5m | How long a claim blocks other workers |
//! | `concurrency` | 8 | Conversations processed at once |
//!
//! ## Graceful Shutdown
//!
//! The loop listens on a watch channel and finishes the sweep in flight
//! before stopping.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::application::{ConversationLocks, LifecycleActions};
use crate::domain::foundation::{ConversationId, DomainError, WorkerId};
use crate::domain::lifecycle::LifecycleDecision;
use crate::ports::Clock;

/// Configuration for the LifecycleSweeper service.
#[derive(Debug, Clone)]
pub struct LifecycleSweeperConfig {
    /// Time between sweeps.
    pub interval: Duration,

    /// How long a claim keeps other workers off a conversation.
    pub lease: Duration,

    /// Maximum conversations processed concurrently.
    pub concurrency: usize,

    /// Identity used when claiming conversations.
    pub worker_id: WorkerId,
}

impl Default for LifecycleSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            lease: Duration::from_secs(5 * 60),
            concurrency: 8,
            worker_id: WorkerId::new(),
        }
    }
}

impl LifecycleSweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_worker_id(mut self, worker_id: WorkerId) -> Self {
        self.worker_id = worker_id;
        self
    }
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Open conversations seen at the start of the sweep.
    pub processed: usize,
    pub warned: usize,
    pub closed: usize,
    pub node_timeouts: usize,
    /// Claimed by another worker.
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: SweepOutcome) {
        match outcome {
            SweepOutcome::Unchanged => {}
            SweepOutcome::Warned => self.warned += 1,
            SweepOutcome::Closed => self.closed += 1,
            SweepOutcome::NodeTimeout => self.node_timeouts += 1,
            SweepOutcome::Skipped => self.skipped += 1,
            SweepOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepOutcome {
    Unchanged,
    Warned,
    Closed,
    NodeTimeout,
    Skipped,
    Failed,
}

impl From<&LifecycleDecision> for SweepOutcome {
    fn from(decision: &LifecycleDecision) -> Self {
        match decision {
            LifecycleDecision::Keep => SweepOutcome::Unchanged,
            LifecycleDecision::Warn { .. } => SweepOutcome::Warned,
            LifecycleDecision::Close(_) => SweepOutcome::Closed,
            LifecycleDecision::NodeTimeout { .. } => SweepOutcome::NodeTimeout,
        }
    }
}

/// Background service applying lifecycle decisions to open conversations.
pub struct LifecycleSweeper {
    lifecycle: LifecycleActions,
    locks: ConversationLocks,
    clock: Arc<dyn Clock>,
    config: LifecycleSweeperConfig,
}

impl LifecycleSweeper {
    /// Create a new sweeper with default configuration.
    pub fn new(lifecycle: LifecycleActions, locks: ConversationLocks, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(lifecycle, locks, clock, LifecycleSweeperConfig::default())
    }

    pub fn with_config(
        lifecycle: LifecycleActions,
        locks: ConversationLocks,
        clock: Arc<dyn Clock>,
        config: LifecycleSweeperConfig,
    ) -> Self {
        Self {
            lifecycle,
            locks,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleSweeperConfig {
        &self.config
    }

    /// Run the sweep loop until the shutdown signal is received.
    ///
    /// A sweep that cannot list conversations is logged and retried on the
    /// next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        info!(
            worker_id = %self.config.worker_id,
            interval_secs = self.config.interval.as_secs(),
            "Lifecycle sweeper started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(worker_id = %self.config.worker_id, "Lifecycle sweeper stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(err) = self.sweep_once().await {
                        warn!(error = %err, "Lifecycle sweep failed");
                    }
                }
            }
        }
    }

    /// Run exactly one sweep over every open conversation.
    ///
    /// # Errors
    ///
    /// Only when the open conversations cannot be listed. Per-conversation
    /// failures are counted in the report.
    pub async fn sweep_once(&self) -> Result<SweepReport, DomainError> {
        let ids = self.lifecycle.repository().list_active().await?;
        let mut report = SweepReport {
            processed: ids.len(),
            ..SweepReport::default()
        };

        let outcomes: Vec<SweepOutcome> = stream::iter(ids)
            .map(|id| self.sweep_conversation(id))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        for outcome in outcomes {
            report.record(outcome);
        }

        if report.warned + report.closed + report.node_timeouts + report.failed > 0 {
            info!(
                processed = report.processed,
                warned = report.warned,
                closed = report.closed,
                node_timeouts = report.node_timeouts,
                skipped = report.skipped,
                failed = report.failed,
                "Lifecycle sweep finished"
            );
        } else {
            debug!(processed = report.processed, skipped = report.skipped, "Lifecycle sweep idle");
        }
        Ok(report)
    }

    async fn sweep_conversation(&self, id: ConversationId) -> SweepOutcome {
        match self.claim_and_apply(id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(conversation_id = %id, error = %err, "Lifecycle step failed");
                SweepOutcome::Failed
            }
        }
    }

    async fn claim_and_apply(&self, id: ConversationId) -> Result<SweepOutcome, DomainError> {
        let repository = self.lifecycle.repository();
        let worker = self.config.worker_id;

        if !repository
            .try_claim(&id, worker, self.clock.now(), self.config.lease)
            .await?
        {
            debug!(conversation_id = %id, "Claimed by another worker");
            return Ok(SweepOutcome::Skipped);
        }

        let result = self.apply_due(id).await;

        if let Err(err) = repository.release_claim(&id, worker).await {
            warn!(conversation_id = %id, error = %err, "Failed to release claim");
        }
        result
    }

    async fn apply_due(&self, id: ConversationId) -> Result<SweepOutcome, DomainError> {
        let repository = self.lifecycle.repository();

        let Some(listed) = repository.load(&id).await? else {
            return Ok(SweepOutcome::Unchanged);
        };
        let _guard = self.locks.lock(listed.subject()).await;

        // Reload under the lock; a turn may have landed since the listing
        let Some(mut conversation) = repository.load(&id).await? else {
            return Ok(SweepOutcome::Unchanged);
        };
        let now = self.clock.now();
        let decision = self.lifecycle.decide(&conversation, now);
        self.lifecycle.apply(&mut conversation, &decision, now).await?;
        Ok(SweepOutcome::from(&decision))
    }
}
