/// Progress statistics attached to every batch handed to the consumer.
///
/// `nonces_per_second` and `seconds_left` are derived from wall-clock time
/// since the loop started, not from the current batch alone, so they settle
/// down rather than jittering block to block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    pub seconds_elapsed: f64,
    pub processed_nonces: u64,
    pub nonces_per_second: f64,
    pub nonces_left: u64,
    pub seconds_left: f64,
}

/// Safety margin applied to the projected `seconds_left`, so a consumer
/// polling on a schedule doesn't report "done" slightly before it is.
const SECONDS_LEFT_MARGIN: f64 = 1.1;

impl Statistics {
    /// `seconds_elapsed` can be zero on the very first processed block: the
    /// rate is then undefined rather than infinite or zero, so `seconds_left`
    /// reports `f64::INFINITY` (no finite estimate yet) instead of `NaN`.
    pub fn compute(seconds_elapsed: f64, processed_nonces: u64, current_tip: u64, last_processed: u64) -> Self {
        let nonces_per_second = if seconds_elapsed > 0.0 {
            processed_nonces as f64 / seconds_elapsed
        } else {
            0.0
        };
        let nonces_left = current_tip.saturating_sub(last_processed);
        let seconds_left = if nonces_per_second > 0.0 {
            nonces_left as f64 / nonces_per_second * SECONDS_LEFT_MARGIN
        } else {
            f64::INFINITY
        };
        Self {
            seconds_elapsed,
            processed_nonces,
            nonces_per_second,
            nonces_left,
            seconds_left,
        }
    }
}
