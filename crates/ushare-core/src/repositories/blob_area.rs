//! Blob area trait (port)
//!
//! Layout is `<root>/<group name>/<file id>`, flat, no extensions.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::FileId;
use crate::error::DomainError;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<BlobError> for DomainError {
    fn from(e: BlobError) -> Self {
        DomainError::StorageError(e.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobArea: Send + Sync {
    /// Fails with `AlreadyExists` if the directory is already there.
    async fn create_group_dir(&self, group: &str) -> Result<(), BlobError>;
    /// Recursive. An absent directory is not an error.
    async fn remove_group_dir(&self, group: &str) -> Result<(), BlobError>;
    async fn group_dir_exists(&self, group: &str) -> Result<bool, BlobError>;
    async fn write_file(&self, group: &str, file_id: FileId, content: Bytes) -> Result<(), BlobError>;
    /// Fails with `NotFound` when the file is missing.
    async fn read_file(&self, group: &str, file_id: FileId) -> Result<Bytes, BlobError>;
    /// An absent file is not an error.
    async fn remove_file(&self, group: &str, file_id: FileId) -> Result<(), BlobError>;
}
