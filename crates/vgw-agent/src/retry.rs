//! LLM smart retry (spec §7, §4.6 Phase 1 step 2).
//!
//! Exponential backoff 1s/2s/4s, capped at a configurable retry count; only
//! retryable error classes are retried (`GatewayError::retryable`, set by
//! the LLM adapter per spec §7's status-code classification).

use std::future::Future;
use std::time::Duration;

use vgw_core::error::GatewayError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Backoff delay before the `attempt`-th retry (0-indexed): 1s, 2s, 4s, ...
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt)
}

/// Run `call` up to `policy.max_retries` additional times after the first
/// attempt, sleeping the exponential backoff between attempts, stopping as
/// soon as an error is non-retryable.
pub async fn retry_llm_call<T, F, Fut>(policy: RetryPolicy, mut call: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable && attempt < policy.max_retries => {
                tokio::time::sleep(backoff_delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
