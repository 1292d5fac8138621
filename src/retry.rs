use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub retries: u32,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(300),
            retries: 3,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    // retry is 1-based
    pub fn delay(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn total_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Returns `None` once every attempt failed; errors are only logged.
pub async fn retry_with_backoff<T, E, F, Fut>(label: &str, policy: Backoff, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 0..policy.total_attempts() {
        if attempt > 0 {
            tokio::time::sleep(policy.delay(attempt)).await;
        }
        match op().await {
            Ok(value) => return Some(value),
            Err(e) => debug!(
                "{} attempt {}/{} failed: {}",
                label,
                attempt + 1,
                policy.total_attempts(),
                e
            ),
        }
    }
    None
}
