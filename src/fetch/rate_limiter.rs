//! Process-wide request spacing
//!
//! Every outbound request waits here first. The gap enforced between two
//! consecutive requests is drawn uniformly between `1 / max_requests_per_second`
//! and `1 / min_requests_per_second`, so traffic is both bounded and
//! irregular.

use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Jittered minimum-interval limiter shared by all request paths
#[derive(Debug)]
pub struct RateLimiter {
    /// Shortest gap, derived from the maximum request rate
    min_interval: Duration,

    /// Longest gap, derived from the minimum request rate
    max_interval: Duration,

    /// Completion time of the previous `wait`. The lock is held across the
    /// whole read-sleep-update sequence.
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing between `min_requests_per_second` and
    /// `max_requests_per_second` requests per second
    ///
    /// Both rates must be positive and `min <= max`; configuration validation
    /// guarantees this for limiters built from a [`Config`](crate::Config).
    pub fn new(min_requests_per_second: f64, max_requests_per_second: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / max_requests_per_second),
            max_interval: Duration::from_secs_f64(1.0 / min_requests_per_second),
            last_request: Mutex::new(None),
        }
    }

    /// Blocks until the next request may be sent, then records the send time
    ///
    /// The first call returns immediately.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let target = self.draw_interval();
            let elapsed = previous.elapsed();
            if elapsed < target {
                tokio::time::sleep(target - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Smallest gap this limiter will ever enforce
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Largest gap this limiter will ever enforce
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    fn draw_interval(&self) -> Duration {
        if self.max_interval <= self.min_interval {
            return self.min_interval;
        }
        let secs = rand::rng()
            .random_range(self.min_interval.as_secs_f64()..=self.max_interval.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}
