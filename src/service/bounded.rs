//! Run a unit of external work with a hard wall-clock ceiling.

use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// How a bounded unit of work ended, from the caller's point of view.
#[derive(Debug)]
pub enum Bounded<T> {
    Ok(T),
    Failed(AppError),
    TimedOut,
}

/// Spawn `work` on the runtime and wait for it at most `ceiling`.
///
/// On timeout the task is detached, not aborted: it runs to completion in the
/// background and its output is dropped. Only hand in work that is safe to
/// finish unobserved.
pub async fn run_bounded<T, F>(ceiling: Duration, work: F) -> Bounded<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    let handle = tokio::spawn(work);
    match timeout(ceiling, handle).await {
        Ok(Ok(Ok(value))) => Bounded::Ok(value),
        Ok(Ok(Err(e))) => Bounded::Failed(e),
        Ok(Err(join_err)) => {
            warn!(error = %join_err, "bounded task did not finish cleanly");
            Bounded::Failed(AppError::ExternalFailure(join_err.to_string()))
        }
        Err(_) => {
            warn!(ceiling_secs = ceiling.as_secs(), "bounded task exceeded ceiling; abandoning");
            Bounded::TimedOut
        }
    }
}
