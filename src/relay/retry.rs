//! Retry with exponential backoff for non-streaming upstream calls.
//!
//! Mirrors raise-on-non-2xx semantics: every failed attempt -- connect
//! error, timeout, or error status -- schedules the next one. Streaming
//! requests never go through here; replaying a partially consumed stream
//! would duplicate chunks the client already saw.

use std::time::Duration;

/// Total attempts for a non-streaming upstream call.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay; the wait before attempt `n + 1` is `BASE_DELAY * 2^(n-1)`.
pub const BASE_DELAY: Duration = Duration::from_secs(1);

/// Run `send_request` up to [`MAX_ATTEMPTS`] times with exponential backoff.
///
/// The closure receives the zero-based attempt number. The last error is
/// returned once attempts are exhausted.
pub async fn with_backoff<T, E, F, Fut>(send_request: F) -> std::result::Result<T, E>
where
    F: Fn(u32) -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
{
    let mut last_error: Option<E> = None;

    for attempt in 0..MAX_ATTEMPTS {
        // Backoff before retry (not before the first attempt)
        if attempt > 0 {
            tokio::time::sleep(BASE_DELAY * 2u32.pow(attempt - 1)).await;
        }

        match send_request(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_error = Some(err);
            }
        }
    }

    Err(last_error.expect("at least one attempt was made"))
}
