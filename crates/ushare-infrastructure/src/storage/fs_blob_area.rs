// ============================================================================
// UShare Infrastructure - Filesystem Blob Area
// File: crates/ushare-infrastructure/src/storage/fs_blob_area.rs
// Description: <root>/<group name>/<file id>, flat, no extensions
// ============================================================================

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use ushare_core::domain::FileId;
use ushare_core::repositories::{BlobArea, BlobError};

pub struct FsBlobArea {
    root: PathBuf,
}

impl FsBlobArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it is missing.
    pub async fn ensure_root(&self) -> Result<(), BlobError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;
        info!(root = %self.root.display(), "Blob area ready");
        Ok(())
    }

    /// Remove every group directory under the root and return how many went.
    ///
    /// Used at startup when the metadata store does not survive restarts;
    /// directories left from a previous run would otherwise block their names.
    /// Plain files directly under the root are not group data and stay.
    pub async fn discard_groups(&self) -> Result<usize, BlobError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, e))?
        {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| io_error(&path, e))?;
            if !file_type.is_dir() {
                continue;
            }
            fs::remove_dir_all(&path)
                .await
                .map_err(|e| io_error(&path, e))?;
            debug!(path = %path.display(), "Stale group directory discarded");
            removed += 1;
        }

        info!(root = %self.root.display(), removed, "Stale group directories discarded");
        Ok(removed)
    }

    fn group_dir(&self, group: &str) -> Result<PathBuf, BlobError> {
        if !is_plain_component(group) {
            return Err(BlobError::InvalidName(group.to_string()));
        }
        Ok(self.root.join(group))
    }

    fn file_path(&self, group: &str, file_id: FileId) -> Result<PathBuf, BlobError> {
        Ok(self.group_dir(group)?.join(file_id.to_string()))
    }
}

/// Exactly one normal path component: no separators, no `.`/`..`, no root.
fn is_plain_component(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    )
}

fn io_error(path: &Path, source: std::io::Error) -> BlobError {
    BlobError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl BlobArea for FsBlobArea {
    async fn create_group_dir(&self, group: &str) -> Result<(), BlobError> {
        let dir = self.group_dir(group)?;
        match fs::create_dir(&dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "Group directory created");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(BlobError::AlreadyExists(dir.display().to_string()))
            }
            Err(e) => Err(io_error(&dir, e)),
        }
    }

    async fn remove_group_dir(&self, group: &str) -> Result<(), BlobError> {
        let dir = self.group_dir(group)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "Group directory removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&dir, e)),
        }
    }

    async fn group_dir_exists(&self, group: &str) -> Result<bool, BlobError> {
        let dir = self.group_dir(group)?;
        fs::try_exists(&dir).await.map_err(|e| io_error(&dir, e))
    }

    async fn write_file(&self, group: &str, file_id: FileId, content: Bytes) -> Result<(), BlobError> {
        let path = self.file_path(group, file_id)?;

        // Ids are never reused, so an existing file is an error, not an overwrite.
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => BlobError::AlreadyExists(path.display().to_string()),
                _ => io_error(&path, e),
            })?;

        file.write_all(&content).await.map_err(|e| io_error(&path, e))?;
        file.sync_all().await.map_err(|e| io_error(&path, e))?;
        Ok(())
    }

    async fn read_file(&self, group: &str, file_id: FileId) -> Result<Bytes, BlobError> {
        let path = self.file_path(group, file_id)?;
        match fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn remove_file(&self, group: &str, file_id: FileId) -> Result<(), BlobError> {
        let path = self.file_path(group, file_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn area() -> (TempDir, FsBlobArea) {
        let dir = TempDir::new().unwrap();
        let area = FsBlobArea::new(dir.path());
        (dir, area)
    }

    #[test]
    fn test_plain_component() {
        assert!(is_plain_component("team-x-files"));
        assert!(is_plain_component("team_x.v2"));
        assert!(!is_plain_component(""));
        assert!(!is_plain_component("."));
        assert!(!is_plain_component(".."));
        assert!(!is_plain_component("a/b"));
        assert!(!is_plain_component("/etc"));
        assert!(!is_plain_component("a\\b"));
    }

    #[tokio::test]
    async fn test_group_dir_lifecycle() {
        let (_dir, area) = area();

        area.create_group_dir("team-x-files").await.unwrap();
        assert!(area.group_dir_exists("team-x-files").await.unwrap());
        assert!(matches!(
            area.create_group_dir("team-x-files").await,
            Err(BlobError::AlreadyExists(_))
        ));

        area.write_file("team-x-files", 1, Bytes::from_static(b"hello"))
            .await
            .unwrap();
        area.remove_group_dir("team-x-files").await.unwrap();
        assert!(!area.group_dir_exists("team-x-files").await.unwrap());

        // Absent directory is success.
        area.remove_group_dir("team-x-files").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_round_trip_and_layout() {
        let (dir, area) = area();
        area.create_group_dir("team-x-files").await.unwrap();

        area.write_file("team-x-files", 42, Bytes::from_static(b"\x00binary\xff"))
            .await
            .unwrap();
        assert!(dir.path().join("team-x-files").join("42").is_file());
        assert_eq!(
            area.read_file("team-x-files", 42).await.unwrap(),
            Bytes::from_static(b"\x00binary\xff")
        );

        assert!(matches!(
            area.write_file("team-x-files", 42, Bytes::new()).await,
            Err(BlobError::AlreadyExists(_))
        ));

        area.remove_file("team-x-files", 42).await.unwrap();
        area.remove_file("team-x-files", 42).await.unwrap();
        assert!(matches!(
            area.read_file("team-x-files", 42).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (_dir, area) = area();
        assert!(matches!(
            area.create_group_dir("../escape").await,
            Err(BlobError::InvalidName(_))
        ));
        assert!(matches!(
            area.remove_group_dir("..").await,
            Err(BlobError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_discard_groups_clears_previous_run() {
        let (dir, area) = area();
        area.create_group_dir("team-x-files").await.unwrap();
        area.write_file("team-x-files", 1, Bytes::from_static(b"hello"))
            .await
            .unwrap();
        area.create_group_dir("group-bravo").await.unwrap();
        std::fs::write(dir.path().join("README"), b"keep").unwrap();

        let restarted = FsBlobArea::new(area.root());
        assert_eq!(restarted.discard_groups().await.unwrap(), 2);
        assert!(!restarted.group_dir_exists("team-x-files").await.unwrap());
        assert!(dir.path().join("README").is_file());
        restarted.create_group_dir("team-x-files").await.unwrap();
    }

    #[tokio::test]
    async fn test_discard_groups_without_root() {
        let (dir, _) = area();
        let area = FsBlobArea::new(dir.path().join("never-created"));
        assert_eq!(area.discard_groups().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_into_missing_group_fails() {
        let (_dir, area) = area();
        assert!(matches!(
            area.write_file("nobody-here", 1, Bytes::from_static(b"x")).await,
            Err(BlobError::Io { .. })
        ));
    }
}
