use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Spaces out calls to the generation service
///
/// Every `acquire` waits until at least `min_interval` has passed since the
/// previous acquisition. The time of the last call sits behind an async
/// mutex held across the wait, so concurrent callers are admitted one at a
/// time in lock order.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Allow up to `calls` acquisitions per second; zero calls disables limiting
    pub fn per_second(calls: u32) -> Self {
        if calls == 0 {
            return Self::unlimited();
        }
        Self::new(Duration::from_secs(1) / calls)
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
