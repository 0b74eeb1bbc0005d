//! Directory-backed segment file lister

use super::traits::{SegmentFileLister, StorageError};
use crate::recorder::chunk::SEGMENT_EXT;
use async_trait::async_trait;
use std::path::PathBuf;

/// Lists segment files (by extension) in a single recordings directory
pub struct DirectoryLister {
    dir: PathBuf,
}

impl DirectoryLister {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SegmentFileLister for DirectoryLister {
    async fn list_segment_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut files = Vec::new();
        if !self.dir.exists() {
            // Nothing recorded yet; an empty pass, not an error
            return Ok(files);
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_segment = path
                .extension()
                .map(|e| e == SEGMENT_EXT)
                .unwrap_or(false);
            if is_segment && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn lists_only_segment_files() {
        let dir = tempdir().unwrap();
        let segment = "rec-20260828-115500-000-20260828-120000-utc+0000.m4a";
        std::fs::write(dir.path().join(segment), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub.m4a")).unwrap();

        let lister = DirectoryLister::new(dir.path());
        let files = lister.list_segment_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(segment));
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let lister = DirectoryLister::new("/definitely/not/here");
        assert!(lister.list_segment_files().await.unwrap().is_empty());
    }
}
