use async_trait::async_trait;
use serde::Deserialize;
use shard_follower_core::cursor::CursorStore;
use shard_follower_core::options::Consumer;
use shard_follower_core::stats::Statistics;
use shard_follower_types::{Nonce, ShardId, ShardTransaction};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::OutputStorageConfig;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorStorageConfig {
    /// Path to the JSON file recording the last processed nonce per shard.
    pub path: String,
}

/// Persists cursors as a single `{shardId: nonce}` JSON file, rewritten
/// atomically (write to a `.PARTIAL` sibling, then rename) on every save.
pub struct FileCursorStore {
    path: std::path::PathBuf,
    cursors: Mutex<HashMap<ShardId, Nonce>>,
}

impl FileCursorStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let cursors = read_cursors(&path).unwrap_or_default();
        Self {
            path,
            cursors: Mutex::new(cursors),
        }
    }
}

fn read_cursors(path: &std::path::Path) -> Option<HashMap<ShardId, Nonce>> {
    let file = std::fs::File::open(path).ok()?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).ok()
}

#[async_trait]
impl CursorStore for FileCursorStore {
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
        let snapshot = {
            let mut cursors = self.cursors.lock().unwrap();
            cursors.insert(shard_id, nonce);
            cursors.clone()
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("PARTIAL");
        let file = std::fs::File::create(&tmp_path)?;
        serde_json::to_writer(file, &snapshot)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Writes every delivered batch as its own JSON file, bucketed into
/// subdirectories of `batch_size` nonces, one subtree per shard.
pub struct FileConsumer {
    config: OutputStorageConfig,
}

impl FileConsumer {
    pub fn new(config: OutputStorageConfig) -> Self {
        Self { config }
    }
}

#[derive(serde::Serialize)]
struct DeliveredBatch<'a> {
    shard_id: ShardId,
    nonce: Nonce,
    block_hash: &'a str,
    transactions: &'a [ShardTransaction],
    stats: StatisticsDto,
}

#[derive(serde::Serialize)]
struct StatisticsDto {
    seconds_elapsed: f64,
    processed_nonces: u64,
    nonces_per_second: f64,
    nonces_left: u64,
    seconds_left: f64,
}

impl From<Statistics> for StatisticsDto {
    fn from(stats: Statistics) -> Self {
        Self {
            seconds_elapsed: stats.seconds_elapsed,
            processed_nonces: stats.processed_nonces,
            nonces_per_second: stats.nonces_per_second,
            nonces_left: stats.nonces_left,
            seconds_left: stats.seconds_left,
        }
    }
}

#[async_trait]
impl Consumer for FileConsumer {
    async fn on_transactions_received(
        &self,
        shard_id: ShardId,
        nonce: Nonce,
        block_hash: &str,
        transactions: Vec<ShardTransaction>,
        stats: Statistics,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let shard_dir = std::path::Path::new(&self.config.path).join(shard_id.to_string());
        let bucket = nonce - (nonce % self.config.batch_size);
        let bucket_dir = shard_dir.join(bucket.to_string());
        std::fs::create_dir_all(&bucket_dir)?;

        let batch = DeliveredBatch {
            shard_id,
            nonce,
            block_hash,
            transactions: &transactions,
            stats: stats.into(),
        };

        let mut tmp_path = bucket_dir.clone();
        tmp_path.push(".PARTIAL");
        let file = std::fs::File::create(&tmp_path)?;
        serde_json::to_writer(file, &batch)?;

        let target_path = bucket_dir.join(format!("{nonce}.json"));
        std::fs::rename(tmp_path, target_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shard_follower_core::cursor::CursorStore as _;

    #[tokio::test]
    async fn cursor_store_round_trips_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursors.json");

        let store = FileCursorStore::new(&path);
        store.save(0, 42).await.unwrap();
        store.save(1, 7).await.unwrap();

        let reloaded = FileCursorStore::new(&path);
        assert_eq!(reloaded.load(0, 0).await.unwrap(), Some(42));
        assert_eq!(reloaded.load(1, 0).await.unwrap(), Some(7));
        assert_eq!(reloaded.load(2, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn consumer_writes_a_json_file_per_nonce() {
        let dir = tempfile::tempdir().unwrap();
        let consumer = FileConsumer::new(OutputStorageConfig {
            path: dir.path().to_string_lossy().to_string(),
            batch_size: 1000,
        });

        let stats = Statistics::compute(10.0, 1, 100, 100);
        consumer
            .on_transactions_received(0, 55, "hash", vec![], stats)
            .await
            .unwrap();

        let expected = dir.path().join("0").join("0").join("55.json");
        assert!(expected.exists());
    }
}
