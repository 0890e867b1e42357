use crate::metrics;
use shard_follower_types::{ShardId, ShardTransaction};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// How long a logical transaction may sit without completing before the
/// reconciler gives up on it and drops it from memory.
pub const GRACE_PERIOD: Duration = Duration::from_secs(600);

struct Entry {
    transaction: ShardTransaction,
    counter: i64,
    created: Instant,
}

/// Tracks in-flight cross-shard transactions and their outstanding SCRs,
/// delivering each logical transaction exactly once, once its counter
/// returns to zero.
///
/// A single instance is owned by the orchestrator and shared across every
/// shard's tick: an outbound SCR is recorded by the transaction's source
/// shard (Pass 1) while the matching inbound SCR is recorded by its
/// destination shard (Pass 2), so the two passes only ever meet if both
/// shards reconcile against the same table.
#[derive(Default)]
pub struct CrossShardReconciler {
    entries: HashMap<String, Entry>,
}

impl CrossShardReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether `hash` is the original hash of a transaction whose SCR chain
    /// hasn't completed yet.
    pub fn is_in_flight(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    /// Feeds one block's transactions through the outbound/inbound/
    /// completion passes and returns the logical transactions that became
    /// complete as a result, in no particular order.
    pub fn reconcile(
        &mut self,
        shard_id: ShardId,
        now: Instant,
        transactions: &[ShardTransaction],
    ) -> Vec<ShardTransaction> {
        // Pass 1: outbound SCRs leaving this shard open or extend an entry.
        for tx in transactions {
            let Some(original_hash) = &tx.original_transaction_hash else {
                continue;
            };
            if tx.source_shard != shard_id || tx.destination_shard == shard_id {
                continue;
            }
            if !self.entries.contains_key(original_hash) {
                match transactions.iter().find(|t| &t.hash == original_hash) {
                    Some(seed) => {
                        tracing::debug!(
                            target: "cross_shard_scr",
                            shard_id,
                            hash = %original_hash,
                            "tracking new cross-shard transaction"
                        );
                        self.entries.insert(
                            original_hash.clone(),
                            Entry {
                                transaction: seed.clone(),
                                counter: 0,
                                created: now,
                            },
                        );
                    }
                    None => {
                        tracing::warn!(
                            target: "cross_shard_scr",
                            shard_id,
                            hash = %original_hash,
                            "outbound SCR references a transaction not present in this block"
                        );
                        continue;
                    }
                }
            }
            if tx.is_ok_acknowledgement() {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(original_hash) {
                entry.counter += 1;
            }
        }

        // Pass 2: inbound SCRs arriving at this shard close out an entry.
        for tx in transactions {
            let Some(original_hash) = &tx.original_transaction_hash else {
                continue;
            };
            if tx.source_shard == shard_id || tx.destination_shard != shard_id {
                continue;
            }
            let Some(entry) = self.entries.get_mut(original_hash) else {
                tracing::warn!(
                    target: "cross_shard_scr",
                    shard_id,
                    hash = %original_hash,
                    "inbound SCR for a transaction this shard never saw leave"
                );
                continue;
            };
            if tx.is_ok_acknowledgement() {
                continue;
            }
            entry.counter -= 1;
        }

        // Pass 3: deliver everything whose counter has returned to zero,
        // unless the block already delivered it directly.
        let direct_hashes: HashSet<&str> =
            transactions.iter().map(|t| t.hash.as_str()).collect();
        let zeroed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.counter == 0)
            .map(|(hash, _)| hash.clone())
            .collect();
        let mut completed = Vec::new();
        for hash in zeroed {
            let entry = self.entries.remove(&hash).expect("key from this map");
            if direct_hashes.contains(entry.transaction.hash.as_str()) {
                continue;
            }
            completed.push(entry.transaction);
        }
        metrics::CROSS_SHARD_COMPLETIONS.inc_by(completed.len() as u64);
        metrics::CROSS_SHARD_ENTRIES.set(self.entries.len() as i64);
        completed
    }

    /// Drops entries older than [`GRACE_PERIOD`]; called once per orchestrator
    /// sweep, independent of any particular shard's block cadence.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.created) < GRACE_PERIOD);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            metrics::CROSS_SHARD_PRUNED.inc_by(pruned as u64);
            metrics::CROSS_SHARD_ENTRIES.set(self.entries.len() as i64);
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: &str, source: ShardId, dest: ShardId, original: Option<&str>) -> ShardTransaction {
        ShardTransaction {
            hash: hash.to_string(),
            nonce: 1,
            sender: String::new(),
            receiver: String::new(),
            value: "0".to_string(),
            source_shard: source,
            destination_shard: dest,
            status: "success".to_string(),
            data: None,
            original_transaction_hash: original.map(str::to_string),
            gas_price: None,
            gas_limit: None,
            previous_transaction_hash: None,
        }
    }

    #[test]
    fn simple_cross_shard_transaction_completes_on_single_scr() {
        // Modeled from shard 0's point of view: it sees the transaction leave
        // towards shard 1, then later sees the acknowledging SCR return.
        let mut reconciler = CrossShardReconciler::new();
        let now = Instant::now();

        let origin = tx("tx1", 0, 1, None);
        let outbound_scr = tx("scr1", 0, 1, Some("tx1"));
        let completed = reconciler.reconcile(0, now, &[origin, outbound_scr]);
        assert!(completed.is_empty());
        assert_eq!(reconciler.in_flight_count(), 1);

        let inbound_scr = tx("scr1-ack", 1, 0, Some("tx1"));
        let completed = reconciler.reconcile(0, now, &[inbound_scr]);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].hash, "tx1");
        assert_eq!(reconciler.in_flight_count(), 0);
    }

    #[test]
    fn ok_acknowledgement_does_not_move_the_counter() {
        let mut reconciler = CrossShardReconciler::new();
        let now = Instant::now();
        let origin = tx("tx1", 0, 1, None);
        let mut ack = tx("scr-ok", 0, 1, Some("tx1"));
        ack.data = Some("QDZmNmI=".to_string()); // base64("@6f6b")
        let completed = reconciler.reconcile(0, now, &[origin, ack]);
        assert!(completed.is_empty());
        assert_eq!(reconciler.in_flight_count(), 0);
    }

    #[test]
    fn prune_drops_entries_past_the_grace_period() {
        let mut reconciler = CrossShardReconciler::new();
        let now = Instant::now();
        let origin = tx("tx1", 0, 1, None);
        let outbound = tx("scr1", 0, 1, Some("tx1"));
        reconciler.reconcile(0, now, &[origin, outbound]);
        assert_eq!(reconciler.in_flight_count(), 1);

        let pruned = reconciler.prune(now + GRACE_PERIOD + Duration::from_secs(1));
        assert_eq!(pruned, 1);
        assert_eq!(reconciler.in_flight_count(), 0);
    }

    #[test]
    fn unmatched_inbound_scr_is_ignored() {
        let mut reconciler = CrossShardReconciler::new();
        let now = Instant::now();
        let inbound = tx("scr-orphan", 1, 0, Some("nonexistent"));
        let completed = reconciler.reconcile(0, now, &[inbound]);
        assert!(completed.is_empty());
        assert_eq!(reconciler.in_flight_count(), 0);
    }
}
