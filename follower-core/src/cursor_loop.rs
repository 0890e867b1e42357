use crate::clock::Clock;
use crate::metrics;
use crate::options::FollowerOptions;
use crate::reconciler::CrossShardReconciler;
use crate::stats::Statistics;
use crate::tip_estimator::TipEstimator;
use crate::FollowerError;
use shard_follower_gateway::Gateway;
use shard_follower_types::{Nonce, ShardId, ShardTransaction};
use std::sync::Arc;
use std::time::Instant;

/// Result of a single loop iteration, telling the orchestrator whether this
/// shard still has work to do before the sweep can move on.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A block was fetched and handed to the consumer (possibly empty).
    Delivered { nonce: Nonce },
    /// The next block hasn't appeared at the gateway yet.
    NotYetAvailable,
    /// The cursor has caught up to the estimated tip; nothing to do this sweep.
    CaughtUp,
}

/// Drives one shard from its last processed nonce towards the tip, one block
/// at a time.
///
/// Owns the tip estimator seeded from this shard's own gateway responses.
/// The cross-shard reconciler is *not* owned here: it is shared by every
/// shard's loop (an outbound SCR is recorded by its source shard, the
/// matching inbound SCR by its destination shard, so the two only ever meet
/// in a table both shards reconcile against) and is passed into [`tick`](Self::tick)
/// by the orchestrator.
pub struct ShardCursorLoop {
    shard_id: ShardId,
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn Clock>,
    options: Arc<FollowerOptions>,
    tip_estimator: Option<TipEstimator>,
    cursor: Option<Nonce>,
    /// The cursor value observed on the first tick this loop ever served,
    /// used only as the baseline for `Statistics::processed_nonces`.
    start_last: Option<Nonce>,
    loop_started: Instant,
}

impl ShardCursorLoop {
    pub fn new(
        shard_id: ShardId,
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn Clock>,
        options: Arc<FollowerOptions>,
    ) -> Self {
        let loop_started = clock.now();
        Self {
            shard_id,
            gateway,
            clock,
            options,
            tip_estimator: None,
            cursor: None,
            start_last: None,
            loop_started,
        }
    }

    async fn real_tip(&self) -> Option<Nonce> {
        self.gateway.get_tip_nonce(self.shard_id).await
    }

    async fn estimated_tip(&mut self) -> Nonce {
        if self.tip_estimator.is_none() {
            let start_nonce = self.real_tip().await.unwrap_or(0);
            self.tip_estimator = Some(TipEstimator::new(start_nonce, self.clock.now()));
        }
        self.tip_estimator
            .as_ref()
            .expect("just initialized above")
            .estimate(self.clock.now())
    }

    /// Loads this shard's cursor, seeding it to `tip - 1` (not replaying
    /// history) the first time this shard is ever seen.
    async fn load_cursor(&mut self, tip: Nonce) -> Result<Nonce, FollowerError> {
        if let Some(cursor) = self.cursor {
            return Ok(cursor);
        }
        let loaded = self
            .options
            .cursor_store
            .load(self.shard_id, tip)
            .await
            .map_err(FollowerError::CursorStore)?;
        let cursor = match loaded {
            Some(cursor) => cursor,
            None => {
                let seed = tip.saturating_sub(1);
                self.options
                    .cursor_store
                    .save(self.shard_id, seed)
                    .await
                    .map_err(FollowerError::CursorStore)?;
                seed
            }
        };
        self.cursor = Some(cursor);
        Ok(cursor)
    }

    /// Advances this shard by at most one block and reports what happened.
    ///
    /// `reconciler` is shared across every shard's loop; the orchestrator
    /// owns it and passes it in so cross-shard SCRs observed on different
    /// shards reconcile against the same table.
    pub async fn tick(
        &mut self,
        reconciler: &mut CrossShardReconciler,
    ) -> Result<TickOutcome, FollowerError> {
        let tip = self.estimated_tip().await;
        let mut cursor = self.load_cursor(tip).await?;

        if cursor == tip {
            return Ok(TickOutcome::CaughtUp);
        }

        if cursor > tip {
            // The chain's nonce went backwards relative to our estimate:
            // treat it as a reset and realign to the current tip.
            self.options.logger.log(
                "shard_cursor",
                &format!("shard {} reset detected: cursor {cursor} > tip {tip}, snapping to tip", self.shard_id),
            );
            cursor = tip;
            self.cursor = Some(cursor);
        }

        if let Some(max_look_behind) = self.options.max_look_behind {
            if tip.saturating_sub(cursor) > max_look_behind {
                let realigned = tip.saturating_sub(max_look_behind);
                tracing::warn!(
                    shard_id = self.shard_id,
                    old_cursor = cursor,
                    new_cursor = realigned,
                    tip,
                    "shard fell too far behind the estimated tip; realigning cursor"
                );
                self.options.logger.log(
                    "shard_cursor",
                    &format!("shard {} fell too far behind (cursor {cursor}, tip {tip}); realigned to {realigned}", self.shard_id),
                );
                metrics::CURSOR_RESETS.inc();
                cursor = realigned;
                self.cursor = Some(cursor);
            }
        }

        let next_nonce = cursor + 1;
        if self.start_last.is_none() {
            self.start_last = Some(cursor);
        }

        let Some(block) = self
            .gateway
            .get_block_by_nonce(self.shard_id, next_nonce)
            .await
        else {
            return Ok(TickOutcome::NotYetAvailable);
        };

        let now = self.clock.now();

        let mut delivered = Vec::new();
        if self.options.wait_for_finalized_cross_shard_scrs {
            delivered.extend(reconciler.reconcile(self.shard_id, now, &block.transactions));
        }
        delivered.extend(
            block
                .transactions
                .iter()
                .filter(|tx| self.is_directly_relevant(tx, reconciler))
                .cloned(),
        );

        let start_last = self.start_last.expect("set above");
        let seconds_elapsed = now.saturating_duration_since(self.loop_started).as_secs_f64();
        let stats = Statistics::compute(
            seconds_elapsed,
            cursor.saturating_sub(start_last),
            tip,
            cursor,
        );

        if !delivered.is_empty() || self.options.notify_empty_blocks {
            metrics::TRANSACTIONS_DELIVERED.inc_by(delivered.len() as u64);
            self.options
                .consumer
                .on_transactions_received(
                    self.shard_id,
                    next_nonce,
                    &block.block_hash,
                    delivered,
                    stats,
                )
                .await
                .map_err(FollowerError::Consumer)?;
        }

        self.options
            .cursor_store
            .save(self.shard_id, next_nonce)
            .await
            .map_err(FollowerError::CursorStore)?;
        self.cursor = Some(next_nonce);
        metrics::BLOCKS_PROCESSED.inc();

        Ok(TickOutcome::Delivered { nonce: next_nonce })
    }

    /// A transaction belongs to the direct-delivery pass if it finished on
    /// this shard, or the caller opted in to seeing cross-shard starters too
    /// — provided its SCR chain isn't still tracked as in-flight (that's the
    /// reconciler's job to deliver, exactly once, when it completes).
    fn is_directly_relevant(&self, tx: &ShardTransaction, reconciler: &CrossShardReconciler) -> bool {
        let wants_it = tx.destination_shard == self.shard_id
            || self.options.include_cross_shard_started_transactions;
        wants_it && !reconciler.is_in_flight(&tx.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::cursor::InMemoryCursorStore;
    use crate::options::Consumer;
    use async_trait::async_trait;
    use shard_follower_types::GatewayBlock;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Mutex;

    struct MockGateway {
        tip: Nonce,
        blocks: Mutex<std::collections::HashMap<Nonce, GatewayBlock>>,
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn get_shard_ids(&self) -> Vec<ShardId> {
            vec![0]
        }

        async fn get_tip_nonce(&self, _shard_id: ShardId) -> Option<Nonce> {
            Some(self.tip)
        }

        async fn get_block_by_nonce(&self, _shard_id: ShardId, nonce: Nonce) -> Option<GatewayBlock> {
            self.blocks.lock().await.get(&nonce).cloned()
        }
    }

    #[derive(Default)]
    struct CapturingConsumer {
        received: StdMutex<Vec<(Nonce, Vec<ShardTransaction>)>>,
    }

    #[async_trait]
    impl Consumer for CapturingConsumer {
        async fn on_transactions_received(
            &self,
            _shard_id: ShardId,
            nonce: Nonce,
            _block_hash: &str,
            transactions: Vec<ShardTransaction>,
            _stats: Statistics,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.received.lock().unwrap().push((nonce, transactions));
            Ok(())
        }
    }

    fn tx(hash: &str, dest: ShardId) -> ShardTransaction {
        ShardTransaction {
            hash: hash.to_string(),
            nonce: 1,
            sender: String::new(),
            receiver: String::new(),
            value: "0".to_string(),
            source_shard: 0,
            destination_shard: dest,
            status: "success".to_string(),
            data: None,
            original_transaction_hash: None,
            gas_price: None,
            gas_limit: None,
            previous_transaction_hash: None,
        }
    }

    #[tokio::test]
    async fn fresh_shard_seeds_cursor_just_behind_tip_without_replaying_history() {
        let gateway = Arc::new(MockGateway {
            tip: 50,
            blocks: Mutex::new(Default::default()),
        });
        let clock = Arc::new(TestClock::new());
        let consumer = Arc::new(CapturingConsumer::default());
        let store = Arc::new(InMemoryCursorStore::new());
        let mut options = FollowerOptions::new("http://localhost", consumer.clone());
        options.cursor_store = store.clone();
        let mut cursor_loop = ShardCursorLoop::new(0, gateway, clock, Arc::new(options));
        let mut reconciler = CrossShardReconciler::new();

        // No block at nonce 50 yet: the loop has nothing to fetch, but it
        // must have already persisted a seeded cursor of 49.
        let outcome = cursor_loop.tick(&mut reconciler).await.unwrap();
        assert_eq!(outcome, TickOutcome::NotYetAvailable);
        assert!(consumer.received.lock().unwrap().is_empty());
        use crate::cursor::CursorStore;
        assert_eq!(store.load(0, 50).await.unwrap(), Some(49));
    }

    #[tokio::test]
    async fn delivers_a_block_once_it_appears() {
        let mut blocks = std::collections::HashMap::new();
        blocks.insert(
            51,
            GatewayBlock {
                block_hash: "b51".to_string(),
                transactions: vec![tx("t1", 0)],
            },
        );
        let gateway = Arc::new(MockGateway {
            tip: 51,
            blocks: Mutex::new(blocks),
        });
        let clock = Arc::new(TestClock::new());
        let consumer = Arc::new(CapturingConsumer::default());
        let store = Arc::new(InMemoryCursorStore::new());
        store.save(0, 50).await.unwrap();
        let mut options = FollowerOptions::new("http://localhost", consumer.clone());
        options.cursor_store = store;
        let mut cursor_loop = ShardCursorLoop::new(0, gateway, clock, Arc::new(options));
        let mut reconciler = CrossShardReconciler::new();

        let outcome = cursor_loop.tick(&mut reconciler).await.unwrap();
        assert_eq!(outcome, TickOutcome::Delivered { nonce: 51 });
        let received = consumer.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, 51);
        assert_eq!(received[0].1[0].hash, "t1");
    }

    #[tokio::test]
    async fn cursor_realigns_when_the_shard_falls_too_far_behind() {
        let gateway = Arc::new(MockGateway {
            tip: 1000,
            blocks: Mutex::new(Default::default()),
        });
        let clock = Arc::new(TestClock::new());
        let consumer = Arc::new(CapturingConsumer::default());
        let store = Arc::new(InMemoryCursorStore::new());
        store.save(0, 0).await.unwrap();
        let mut options = FollowerOptions::new("http://localhost", consumer);
        options.max_look_behind = Some(10);
        options.cursor_store = store;
        let mut cursor_loop = ShardCursorLoop::new(0, gateway, clock, Arc::new(options));
        let mut reconciler = CrossShardReconciler::new();

        // Forces a fetch attempt at the realigned cursor rather than nonce 1.
        let _ = cursor_loop.tick(&mut reconciler).await.unwrap();
        assert_eq!(cursor_loop.cursor, Some(990));
    }

    #[tokio::test]
    async fn include_cross_shard_started_transactions_pulls_in_non_local_destinations() {
        let mut blocks = std::collections::HashMap::new();
        blocks.insert(
            1,
            GatewayBlock {
                block_hash: "b1".to_string(),
                transactions: vec![tx("away", 7)],
            },
        );
        let gateway = Arc::new(MockGateway {
            tip: 1,
            blocks: Mutex::new(blocks),
        });
        let clock = Arc::new(TestClock::new());
        let consumer = Arc::new(CapturingConsumer::default());
        let store = Arc::new(InMemoryCursorStore::new());
        store.save(0, 0).await.unwrap();
        let mut options = FollowerOptions::new("http://localhost", consumer.clone());
        options.include_cross_shard_started_transactions = true;
        options.cursor_store = store;
        let mut cursor_loop = ShardCursorLoop::new(0, gateway, clock, Arc::new(options));
        let mut reconciler = CrossShardReconciler::new();

        cursor_loop.tick(&mut reconciler).await.unwrap();
        let received = consumer.received.lock().unwrap();
        assert_eq!(received[0].1[0].hash, "away");
    }
}
