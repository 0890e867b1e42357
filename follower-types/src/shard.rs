//! Shard and nonce identifiers.

/// Identifies one of the `N` execution shards, or the metachain.
pub type ShardId = u32;

/// The sentinel shard id carrying cross-shard coordination data.
///
/// An all-ones 32-bit value, distinct from any execution shard returned by
/// `network/config` (which only ever enumerates `0..N`).
pub const METACHAIN_SHARD_ID: ShardId = u32::MAX;

/// The sequence number of a block within a shard.
pub type Nonce = u64;
