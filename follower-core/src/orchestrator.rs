use crate::clock::{Clock, SystemClock};
use crate::cursor_loop::{ShardCursorLoop, TickOutcome};
use crate::options::FollowerOptions;
use crate::reconciler::CrossShardReconciler;
use crate::FollowerError;
use shard_follower_gateway::Gateway;
use shard_follower_types::ShardId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns one [`ShardCursorLoop`] per shard, plus the single cross-shard
/// [`CrossShardReconciler`] they all reconcile against, and sweeps every
/// shard until each reports it has caught up to its estimated tip.
///
/// The reconciler must be shared rather than per-shard: an outbound SCR is
/// recorded by its source shard, the matching inbound SCR by its destination
/// shard, so a per-shard table would never see both halves of the same
/// logical transaction.
///
/// A single orchestrator must not run two sweeps concurrently: `run` takes an
/// exclusive flag and returns [`FollowerError::AlreadyRunning`] rather than
/// letting two sweeps race over the same cursor stores.
pub struct FollowerOrchestrator {
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn Clock>,
    options: Arc<FollowerOptions>,
    running: AtomicBool,
    loops: tokio::sync::Mutex<HashMap<ShardId, ShardCursorLoop>>,
    reconciler: tokio::sync::Mutex<CrossShardReconciler>,
}

impl FollowerOrchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, options: FollowerOptions) -> Self {
        Self::with_clock(gateway, options, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<dyn Gateway>, options: FollowerOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            options: Arc::new(options),
            running: AtomicBool::new(false),
            loops: tokio::sync::Mutex::new(HashMap::new()),
            reconciler: tokio::sync::Mutex::new(CrossShardReconciler::new()),
        }
    }

    /// Runs one full sweep: every shard is ticked until it reports
    /// [`TickOutcome::CaughtUp`], then every loop's reconciler is pruned.
    ///
    /// Returns the total number of blocks delivered across all shards this
    /// sweep, for callers that want to log or back off when nothing happened.
    pub async fn run_once(&self) -> Result<u64, FollowerError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FollowerError::AlreadyRunning);
        }
        let result = self.sweep().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn sweep(&self) -> Result<u64, FollowerError> {
        let mut reconciler = self.reconciler.lock().await;
        reconciler.prune(self.clock.now());

        let shard_ids = self.gateway.get_shard_ids().await;
        let mut loops = self.loops.lock().await;
        for &shard_id in &shard_ids {
            loops.entry(shard_id).or_insert_with(|| {
                ShardCursorLoop::new(
                    shard_id,
                    self.gateway.clone(),
                    self.clock.clone(),
                    self.options.clone(),
                )
            });
        }

        let mut delivered = 0u64;
        let mut remaining: Vec<ShardId> = shard_ids.clone();
        while !remaining.is_empty() {
            let mut still_behind = Vec::new();
            for shard_id in remaining {
                let cursor_loop = loops.get_mut(&shard_id).expect("seeded above");
                match cursor_loop.tick(&mut reconciler).await? {
                    TickOutcome::Delivered { .. } => {
                        delivered += 1;
                        still_behind.push(shard_id);
                    }
                    TickOutcome::NotYetAvailable | TickOutcome::CaughtUp => {}
                }
            }
            remaining = still_behind;
        }

        Ok(delivered)
    }
}
