use shard_follower_types::Nonce;
use std::time::{Duration, Instant};

/// Wall-clock time between two consecutive shard rounds.
///
/// Matches the target round time of the networks this follower polls; it is
/// not discovered from the gateway, since `network/config` exposes it under a
/// name that varies by network build and the follower doesn't need precision
/// beyond "close enough to avoid polling the tip every iteration".
pub const ROUND_DURATION: Duration = Duration::from_secs(6);

/// Extrapolates a shard's current tip from wall-clock time instead of
/// polling `network/status` on every loop iteration.
///
/// `estimate` is deliberately monotonic and cheap: callers still fall back to
/// a real gateway call to detect the shard falling behind or resetting.
pub struct TipEstimator {
    start_nonce: Nonce,
    start_time: Instant,
}

impl TipEstimator {
    pub fn new(start_nonce: Nonce, start_time: Instant) -> Self {
        Self {
            start_nonce,
            start_time,
        }
    }

    pub fn estimate(&self, now: Instant) -> Nonce {
        let elapsed = now.saturating_duration_since(self.start_time);
        self.start_nonce + elapsed.as_secs() / ROUND_DURATION.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrapolates_one_nonce_per_round() {
        let t0 = Instant::now();
        let estimator = TipEstimator::new(1000, t0);
        assert_eq!(estimator.estimate(t0), 1000);
        assert_eq!(estimator.estimate(t0 + Duration::from_secs(5)), 1000);
        assert_eq!(estimator.estimate(t0 + Duration::from_secs(6)), 1001);
        assert_eq!(estimator.estimate(t0 + Duration::from_secs(61)), 1010);
    }

    #[test]
    fn never_goes_backwards_for_times_before_start() {
        let t0 = Instant::now();
        let estimator = TipEstimator::new(1000, t0);
        assert_eq!(estimator.estimate(t0 - Duration::from_secs(100)), 1000);
    }
}
