pub mod files;
pub mod health;
pub mod session;

use imgcut_core::CoreResult;

use crate::utils::error::ApiError;

/// Run a core operation on the blocking pool. Core operations do disk I/O
/// and image work while holding a session lock.
pub(crate) async fn run_blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::InternalError(format!("worker failed: {}", e)))?
        .map_err(ApiError::from)
}
