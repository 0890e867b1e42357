use crate::cursor::{CursorStore, InMemoryCursorStore};
use crate::stats::Statistics;
use async_trait::async_trait;
use shard_follower_types::{Nonce, ShardId, ShardTransaction};
use std::sync::Arc;

/// Receives delivered batches of transactions, one call per processed nonce.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn on_transactions_received(
        &self,
        shard_id: ShardId,
        nonce: Nonce,
        block_hash: &str,
        transactions: Vec<ShardTransaction>,
        stats: Statistics,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A log sink independent of the `tracing` subscriber installed by the host
/// process, so embedders can route follower diagnostics wherever they like.
pub trait Logger: Send + Sync {
    fn log(&self, topic: &str, message: &str);
}

/// Forwards to `tracing`; the default when no logger is supplied.
#[derive(Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, topic: &str, message: &str) {
        tracing::info!(topic, message);
    }
}

/// Tunables and capability hooks for a running follower.
///
/// Plain fields for the tunables, `Arc<dyn Trait>` for the pluggable behavior.
pub struct FollowerOptions {
    pub gateway_url: String,
    /// How many nonces behind the estimated tip a shard may fall before its
    /// cursor is forcibly realigned to `tip - max_look_behind`. `None` means
    /// no bound: a shard may replay its entire backlog on recovery.
    pub max_look_behind: Option<Nonce>,
    pub wait_for_finalized_cross_shard_scrs: bool,
    pub notify_empty_blocks: bool,
    pub include_cross_shard_started_transactions: bool,
    pub cursor_store: Arc<dyn CursorStore>,
    pub consumer: Arc<dyn Consumer>,
    pub logger: Arc<dyn Logger>,
}

impl FollowerOptions {
    pub fn new(gateway_url: impl Into<String>, consumer: Arc<dyn Consumer>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            max_look_behind: Some(100),
            wait_for_finalized_cross_shard_scrs: true,
            notify_empty_blocks: false,
            include_cross_shard_started_transactions: false,
            cursor_store: Arc::new(InMemoryCursorStore::new()),
            consumer,
            logger: Arc::new(TracingLogger),
        }
    }
}
