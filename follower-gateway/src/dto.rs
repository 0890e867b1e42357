//! Raw gateway response shapes. Every gateway response is wrapped under a
//! top-level `data` envelope; these types exist only to be deserialized once
//! and immediately converted into the normalized domain types in
//! `shard_follower_types`.

use serde::Deserialize;
use shard_follower_types::{Nonce, ShardTransaction};

#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub(crate) struct NetworkConfigEnvelope {
    pub config: NetworkConfig,
}

#[derive(Deserialize)]
pub(crate) struct NetworkConfig {
    pub erd_num_shards_without_meta: u32,
}

#[derive(Deserialize)]
pub(crate) struct NetworkStatusEnvelope {
    pub status: NetworkStatus,
}

#[derive(Deserialize)]
pub(crate) struct NetworkStatus {
    pub erd_nonce: Nonce,
}

#[derive(Deserialize)]
pub(crate) struct BlockEnvelope {
    pub block: Option<RawBlock>,
}

#[derive(Deserialize)]
pub(crate) struct RawBlock {
    pub hash: String,
    #[serde(default, rename = "miniBlocks")]
    pub mini_blocks: Vec<RawMiniBlock>,
}

#[derive(Deserialize)]
pub(crate) struct RawMiniBlock {
    #[serde(default)]
    pub transactions: Vec<ShardTransaction>,
}
