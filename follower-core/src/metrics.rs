use lazy_static::lazy_static;
use prometheus::{self, register_int_counter, register_int_gauge, IntCounter, IntGauge};

lazy_static! {
    pub static ref BLOCKS_PROCESSED: IntCounter = register_int_counter!(
        "follower_blocks_processed",
        "Number of blocks fetched and delivered to the consumer"
    )
    .unwrap();
    pub static ref TRANSACTIONS_DELIVERED: IntCounter = register_int_counter!(
        "follower_transactions_delivered",
        "Number of transactions handed to the consumer callback"
    )
    .unwrap();
    pub static ref CROSS_SHARD_COMPLETIONS: IntCounter = register_int_counter!(
        "follower_cross_shard_completions",
        "Logical transactions delivered via the cross-shard reconciler"
    )
    .unwrap();
    pub static ref CROSS_SHARD_PRUNED: IntCounter = register_int_counter!(
        "follower_cross_shard_pruned",
        "Reconciler entries removed for exceeding the grace period without completing"
    )
    .unwrap();
    pub static ref CROSS_SHARD_ENTRIES: IntGauge = register_int_gauge!(
        "follower_cross_shard_entries",
        "Current number of in-flight logical transactions tracked by the reconciler"
    )
    .unwrap();
    pub static ref CURSOR_RESETS: IntCounter = register_int_counter!(
        "follower_cursor_resets",
        "Number of times a shard cursor was realigned after a network reset"
    )
    .unwrap();
}
