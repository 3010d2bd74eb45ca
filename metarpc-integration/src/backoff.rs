use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exponential backoff with jitter, shared by the reconnect executor and the
/// stream manager's re-subscribe loop: exponential starting at 100 ms,
/// capped around 2 s. Three hard requirements hold regardless of the exact
/// curve: always sleep before the second attempt, observe cancellation
/// during the sleep, and never run past the caller's deadline - those are
/// satisfied by [`Backoff::sleep`], not by the curve itself.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: u32,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            multiplier: 2,
            max: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl From<BackoffPolicy> for Backoff {
    fn from(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.initial,
            policy,
        }
    }
}

impl Backoff {
    pub fn reset(&mut self) {
        self.current = self.policy.initial;
    }

    fn jittered(&self) -> Duration {
        let mut rng = rand::rng();
        let factor = rng.random_range(0.8..=1.2);
        self.current.mul_f64(factor)
    }

    fn advance(&mut self) {
        let next = self.current.saturating_mul(self.policy.multiplier);
        self.current = next.min(self.policy.max);
    }

    /// Sleeps for the current backoff duration (jittered), then advances the
    /// curve for the next call. Returns `false` if `cancel` fired first, in
    /// which case the caller must surface `Cancelled` rather than retry.
    pub async fn sleep(&mut self, cancel: &CancellationToken) -> bool {
        let delay = self.jittered();
        self.advance();

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_caps_at_policy_max() {
        let policy = BackoffPolicy {
            initial: Duration::from_millis(100),
            multiplier: 4,
            max: Duration::from_millis(500),
        };
        let mut backoff = Backoff::from(policy);
        for _ in 0..5 {
            backoff.advance();
        }
        assert!(backoff.current <= Duration::from_millis(500));
    }

    #[test]
    fn reset_restores_initial() {
        let mut backoff = Backoff::from(BackoffPolicy::default());
        backoff.advance();
        backoff.advance();
        backoff.reset();
        assert_eq!(backoff.current, backoff.policy.initial);
    }

    #[tokio::test]
    async fn sleep_observes_cancellation() {
        let mut backoff = Backoff::from(BackoffPolicy {
            initial: Duration::from_secs(30),
            multiplier: 2,
            max: Duration::from_secs(60),
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let completed = backoff.sleep(&cancel).await;
        assert!(!completed);
    }
}
