//! Fixed-delay retry for transient provider errors.
//!
//! Wraps the read-only provider calls (model, instance view, extensions).
//! Non-transient errors and the final transient error propagate unchanged.

use std::future::Future;
use std::time::Duration;

use crate::clock::Clock;
use crate::errors::ProviderError;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Run `operation`, retrying transient provider errors up to 3 attempts
/// with a fixed 30 second delay between them.
pub(crate) async fn execute_with_retry<T, F, Fut>(
    clock: &dyn Clock,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < RETRY_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "transient provider error, retrying");
                clock.sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
