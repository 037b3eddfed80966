//! Bounded fixed-delay retry for calls to outside services.

use std::time::Duration;

use tracing::warn;

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Calls `op` until it succeeds or the policy runs out of attempts.
///
/// The last error is wrapped in `ExternalService` naming `service`.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    service: &str,
    mut op: impl FnMut() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let attempts = policy.attempts.max(1);
    let mut last = String::new();
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(service, attempt, of = attempts, error = %e, "call failed");
                last = match e {
                    PipelineError::ExternalService { reason, .. } => reason,
                    other => other.to_string(),
                };
                if attempt < attempts && !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
            }
        }
    }
    Err(PipelineError::ExternalService {
        service: service.to_string(),
        attempts,
        reason: last,
    })
}
