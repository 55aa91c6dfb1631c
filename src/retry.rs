use std::future::Future;
use std::time::Duration;

/// How a failed operation is classified for retry purposes. Anything that
/// does not map to a class is permanent and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The remote service reported temporary unavailability (or the
    /// transport never reached it).
    TransientUnavailable,
    /// The remote service reported quota/rate exhaustion.
    ResourceExhausted,
}

pub trait Classify {
    fn failure_class(&self) -> Option<FailureClass>;
}

/// Bounded fixed-delay retry policy. `max_attempts` counts the first call:
/// a policy with `max_attempts = 3` makes at most three calls and sleeps at
/// most twice.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub retry_on: FailureClass,
}

impl RetryPolicy {
    /// Canonical default: retry transient unavailability with a short delay.
    pub fn transient_unavailable() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            retry_on: FailureClass::TransientUnavailable,
        }
    }

    /// Alternate policy: retry quota exhaustion with a long delay.
    pub fn resource_exhausted() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(30),
            retry_on: FailureClass::ResourceExhausted,
        }
    }

    pub fn named(name: &str) -> Option<RetryPolicy> {
        match name {
            "transient-unavailable" => Some(RetryPolicy::transient_unavailable()),
            "resource-exhausted" => Some(RetryPolicy::resource_exhausted()),
            _ => None,
        }
    }

    fn should_retry<E: Classify>(&self, err: &E) -> bool {
        err.failure_class() == Some(self.retry_on)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::transient_unavailable()
    }
}

/// Invoke `op` until it succeeds, fails permanently, or the policy's
/// attempt budget runs out. The delay is fixed; no backoff curve, no
/// jitter. The final error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Classify,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if policy.should_retry(&err) && attempts < policy.max_attempts => {
                tracing::warn!(
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    "retryable failure, sleeping {:?} before next attempt",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
