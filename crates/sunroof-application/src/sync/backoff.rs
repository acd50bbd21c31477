use rand::Rng;
use std::time::Duration;
use sunroof_core::config::SyncConfig;

// 2^16 * base is already far past any sensible cap.
const MAX_EXPONENT: u32 = 16;

/// Jittered exponential backoff between automatic sync passes.
///
/// After `n` consecutive failing passes the ceiling is
/// `min(base * 2^(n-1), max)`; the actual delay is drawn uniformly from
/// `[ceiling / 2, ceiling]`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    consecutive_failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.backoff_base(), config.backoff_max())
    }

    /// Records a failing pass and returns how long automatic passes should
    /// hold off.
    pub fn record_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        jitter(self.ceiling())
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Upper bound of the next delay; zero when nothing has failed.
    pub fn ceiling(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (self.consecutive_failures - 1).min(MAX_EXPONENT);
        self.base.saturating_mul(1u32 << exponent).min(self.max)
    }
}

fn jitter(ceiling: Duration) -> Duration {
    if ceiling.is_zero() {
        return ceiling;
    }
    ceiling.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
}
