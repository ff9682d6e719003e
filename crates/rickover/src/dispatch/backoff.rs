//! Idle-wait backoff and start-up jitter shared by every dispatcher worker.

use std::time::Duration;

use rand::Rng;

const BASE_MS: u64 = 10;
const MAX_EXPONENT: u32 = 10;

/// `10ms * min(2^n, 2^10) * jitter`, `jitter ∈ [0.8, 1.2)` uniform.
pub fn acquire_backoff(failed_attempts: u32) -> Duration {
    let exponent = failed_attempts.min(MAX_EXPONENT);
    let multiplier = (1u64 << exponent) as f64;
    Duration::from_millis((BASE_MS as f64 * jitter(multiplier)) as u64)
}

/// Scales `value` by a uniform factor in `[0.8, 1.2)`.
pub fn jitter(value: f64) -> f64 {
    let mut rng = rand::thread_rng();
    value * 0.8 + rng.gen::<f64>() * 0.4 * value
}

/// A uniform delay in `[0, max)`, applied once when a worker is spawned, to
/// avoid every worker in a freshly started pool hammering `acquire` at once.
pub fn startup_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    Duration::from_secs_f64(rng.gen::<f64>() * max.as_secs_f64())
}
