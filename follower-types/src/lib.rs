pub mod shard;
pub mod transaction;

pub use shard::{Nonce, ShardId, METACHAIN_SHARD_ID};
pub use transaction::{GatewayBlock, ShardTransaction};
