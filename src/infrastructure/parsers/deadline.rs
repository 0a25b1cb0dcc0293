use std::time::Duration;

use crate::domain::parser::ParseError;

/// Run CPU-bound extraction on the blocking pool under a deadline
///
/// On timeout the caller gets `Timeout` immediately; the blocking task is
/// detached and its result discarded.
pub async fn run_blocking_with_deadline<T, F>(timeout: Duration, work: F) -> Result<T, ParseError>
where
    F: FnOnce() -> Result<T, ParseError> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ParseError::internal(format!(
            "Extraction task failed: {}",
            join_error
        ))),
        Err(_) => Err(ParseError::timeout(timeout.as_secs().max(1))),
    }
}
