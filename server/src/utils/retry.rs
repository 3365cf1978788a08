//! Async retry utilities with exponential backoff

use std::time::Duration;

/// Maximum write attempts in the response pipeline
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay in milliseconds; attempt n sleeps `base * 2^n` before the next try
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Retry an async operation with exponential backoff.
///
/// Attempt `n` (1-based) that fails sleeps `base_delay_ms * 2^n` milliseconds
/// before the next attempt. Returns `Ok(attempts)` on success, or
/// `Err((error, attempts))` once `max_attempts` is exhausted.
pub async fn retry_with_backoff<F, Fut, E>(
    max_attempts: u32,
    base_delay_ms: u64,
    mut operation: F,
) -> Result<u32, (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(()) => return Ok(attempts),
            Err(e) => {
                if attempts >= max_attempts {
                    return Err((e, attempts));
                }
                let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempts));
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
