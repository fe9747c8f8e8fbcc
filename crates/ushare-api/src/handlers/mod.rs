//! HTTP handlers

pub mod auth;
pub mod files;
pub mod groups;
pub mod health;

use std::future::Future;

use ushare_core::error::DomainError;

use crate::error::ApiError;

/// Run an engine operation on its own task. A client that disconnects drops
/// the handler future, not the operation, so a started transaction and its
/// blob side effect always run to completion.
pub(crate) async fn run_detached<F, T>(operation: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, DomainError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| ApiError::InternalError(format!("engine task failed: {}", e)))?
        .map_err(ApiError::from)
}
