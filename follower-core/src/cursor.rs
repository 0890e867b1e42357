use async_trait::async_trait;
use shard_follower_types::{Nonce, ShardId};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persists the last processed nonce per shard between process runs.
///
/// `load` receives the shard's current tip as context: implementations that
/// have no prior cursor for a shard may use it to seed one (see the Shard
/// Cursor Loop's reset handling), rather than forcing every caller to special
/// case `None` for a shard they've genuinely never seen before.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(
        &self,
        shard_id: ShardId,
        current_nonce: Nonce,
    ) -> Result<Option<Nonce>, Box<dyn std::error::Error + Send + Sync>>;

    async fn save(
        &self,
        shard_id: ShardId,
        nonce: Nonce,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The default cursor store: nothing survives a restart. Good enough for
/// tests and for callers who don't care about resuming from where they left
/// off; `follower-app` installs a file-backed store instead.
#[derive(Default)]
pub struct InMemoryCursorStore {
    cursors: Mutex<HashMap<ShardId, Nonce>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn load(
        &self,
        shard_id: ShardId,
        _current_nonce: Nonce,
    ) -> Result<Option<Nonce>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.cursors.lock().unwrap().get(&shard_id).copied())
    }

    async fn save(
        &self,
        shard_id: ShardId,
        nonce: Nonce,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.cursors.lock().unwrap().insert(shard_id, nonce);
        Ok(())
    }
}
