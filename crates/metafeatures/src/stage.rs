//! Extractor Stage Execution

use tracing::warn;

use crate::record::StageFailure;

/// Run one extractor stage on the blocking pool.
///
/// A stage that errors or panics is absorbed into a `StageFailure`; the
/// record completes best-effort either way.
pub(crate) async fn run<T, F>(stage: &'static str, f: F) -> Result<T, StageFailure>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(reason)) => {
            warn!("stage {} degraded: {}", stage, reason);
            Err(StageFailure {
                stage: stage.to_string(),
                reason,
            })
        }
        Err(join_error) => {
            warn!("stage {} panicked: {}", stage, join_error);
            Err(StageFailure {
                stage: stage.to_string(),
                reason: format!("stage panicked: {join_error}"),
            })
        }
    }
}
