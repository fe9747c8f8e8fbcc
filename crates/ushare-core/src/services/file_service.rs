// ============================================================================
// UShare Core - File Service
// File: crates/ushare-core/src/services/file_service.rs
// Description: Group-scoped file upload, download, deletion and listing
// ============================================================================
//! File service.
//!
//! The store mints file identifiers and is the durability boundary. Blob
//! writes and removals happen after commit and are compensated best-effort.
//!
//! Between an upload's commit and its write the group may be deactivated,
//! reaped and recreated under the same name. The upload re-reads the group
//! just before writing and backs out if it is no longer the same active
//! group. A window between that re-read and the write remains; a file landing
//! there is an orphan without a row until its group is reaped.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};

use super::access::load_active_group_for_member;
use crate::domain::{FileId, FileInfo, Group, GroupId, GroupState, UserId};
use crate::error::DomainError;
use crate::repositories::{BlobArea, BlobError, MembershipStore, StoreTx};

/// Original filename plus exact content of a downloaded file.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub info: FileInfo,
    pub content: Bytes,
}

pub struct FileService {
    store: Arc<dyn MembershipStore>,
    blobs: Arc<dyn BlobArea>,
}

impl FileService {
    pub fn new(store: Arc<dyn MembershipStore>, blobs: Arc<dyn BlobArea>) -> Self {
        Self { store, blobs }
    }

    /// Upload `content` under `filename`. Any member of the active group may upload.
    pub async fn upload(
        &self,
        group_name: &str,
        user_id: UserId,
        filename: &str,
        content: Bytes,
    ) -> Result<FileInfo, DomainError> {
        if filename.trim().is_empty() {
            return Err(DomainError::ValidationError("filename must not be empty".into()));
        }

        // 1. Metadata row, which mints the identifier.
        let info = {
            let mut tx = self.store.begin().await?;
            let group = load_active_group_for_member(tx.as_mut(), group_name, user_id).await?;
            let info = tx.insert_file_info(group.id, user_id, filename).await?;
            tx.commit().await?;
            info
        };

        // 2. The directory must still belong to the group the row points at.
        if let Err(e) = self.confirm_upload_target(group_name, info.group_id).await {
            warn!(
                "Group [{}] changed before file {} was written: {}",
                group_name, info.id, e
            );
            self.compensate_upload(group_name, info.id).await;
            return Err(e);
        }

        // 3. Bytes, after commit.
        let size = content.len();
        if let Err(e) = self.blobs.write_file(group_name, info.id, content).await {
            error!(
                "Writing file {} of group [{}] failed after commit: {}",
                info.id, group_name, e
            );
            self.compensate_upload(group_name, info.id).await;
            return Err(e.into());
        }

        info!(
            "File {} ({}, {} bytes) uploaded to [{}] by user {}",
            info.id, info.name, size, group_name, user_id
        );
        Ok(info)
    }

    async fn confirm_upload_target(
        &self,
        group_name: &str,
        group_id: GroupId,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_group(group_name)
            .await?
            .filter(|group| group.id == group_id);
        tx.commit().await?;

        match GroupState::of(current.as_ref()) {
            GroupState::Active => Ok(()),
            GroupState::Inactive => Err(DomainError::GroupInactive(group_name.to_string())),
            GroupState::Erased => Err(DomainError::GroupErased(group_name.to_string())),
        }
    }

    /// Best-effort removal of a partial file and its metadata row.
    async fn compensate_upload(&self, group_name: &str, file_id: FileId) {
        if let Err(e) = self.blobs.remove_file(group_name, file_id).await {
            warn!("Could not remove partial file {} of [{}]: {}", file_id, group_name, e);
        }

        let result = async {
            let mut tx = self.store.begin().await?;
            tx.delete_file_info(file_id).await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = result {
            // Reads of this id now answer NotFound.
            warn!(
                "Data consistency warning: file info {} of [{}] has no content: {}",
                file_id, group_name, e
            );
        }
    }

    pub async fn download(
        &self,
        group_name: &str,
        user_id: UserId,
        file_id: FileId,
    ) -> Result<DownloadedFile, DomainError> {
        let info = self.file_info(group_name, user_id, file_id).await?;

        let content = self
            .blobs
            .read_file(group_name, file_id)
            .await
            .map_err(|e| match e {
                BlobError::NotFound(_) => {
                    warn!(
                        "Data consistency warning: file {} of [{}] is recorded but missing",
                        file_id, group_name
                    );
                    DomainError::FileNotFound(file_id)
                }
                other => {
                    error!("Reading file {} of [{}] failed: {}", file_id, group_name, other);
                    other.into()
                }
            })?;

        Ok(DownloadedFile { info, content })
    }

    /// Metadata of one file. A file of another group is reported as missing.
    pub async fn file_info(
        &self,
        group_name: &str,
        user_id: UserId,
        file_id: FileId,
    ) -> Result<FileInfo, DomainError> {
        let mut tx = self.store.begin().await?;
        let group = load_active_group_for_member(tx.as_mut(), group_name, user_id).await?;
        let info = find_group_file(tx.as_mut(), &group, file_id).await?;
        tx.commit().await?;
        Ok(info)
    }

    pub async fn list_files(
        &self,
        group_name: &str,
        user_id: UserId,
    ) -> Result<Vec<FileInfo>, DomainError> {
        let mut tx = self.store.begin().await?;
        let group = load_active_group_for_member(tx.as_mut(), group_name, user_id).await?;
        let files = tx.list_file_infos(group.id).await?;
        tx.commit().await?;
        Ok(files)
    }

    /// The file owner or the group owner may delete.
    pub async fn delete(
        &self,
        group_name: &str,
        user_id: UserId,
        file_id: FileId,
    ) -> Result<(), DomainError> {
        {
            let mut tx = self.store.begin().await?;
            let group = load_active_group_for_member(tx.as_mut(), group_name, user_id).await?;
            let info = find_group_file(tx.as_mut(), &group, file_id).await?;

            if !info.is_owned_by(user_id) && !group.is_owned_by(user_id) {
                warn!(
                    "User {} may not delete file {} of [{}]",
                    user_id, file_id, group_name
                );
                return Err(DomainError::NotFileOwner(group_name.to_string()));
            }

            if tx.delete_file_info(file_id).await? == 0 {
                return Err(DomainError::FileNotFound(file_id));
            }
            tx.commit().await?;
        }

        // Identifiers are never reused, so a leftover file is harmless.
        if let Err(e) = self.blobs.remove_file(group_name, file_id).await {
            warn!(
                "File {} of [{}] deleted from the store but not from disk: {}",
                file_id, group_name, e
            );
        }

        info!("File {} deleted from [{}] by user {}", file_id, group_name, user_id);
        Ok(())
    }
}

async fn find_group_file(
    tx: &mut dyn StoreTx,
    group: &Group,
    file_id: FileId,
) -> Result<FileInfo, DomainError> {
    tx.find_file_info(file_id)
        .await?
        .filter(|info| info.belongs_to(group.id))
        .ok_or(DomainError::FileNotFound(file_id))
}
