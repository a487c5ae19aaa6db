use super::{EntryInfo, EntryKind, FileStore};
use crate::core::SyncError;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// 本地文件系统实现
#[derive(Debug, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list_dir(&self, dir: &Path) -> Result<Vec<EntryInfo>, SyncError> {
        let mut reader = fs::read_dir(dir)
            .await
            .map_err(|e| SyncError::from_io(dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| SyncError::from_io(dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SyncError::from_io(entry.path(), e))?;

            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                // 符号链接、套接字等特殊条目不参与同步
                debug!("跳过特殊条目: {}", entry.path().display());
                continue;
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("跳过非 UTF-8 名称的条目: {:?}", raw);
                    continue;
                }
            };

            entries.push(EntryInfo { name, kind });
        }

        Ok(entries)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, SyncError> {
        fs::read(path).await.map_err(|e| SyncError::from_io(path, e))
    }

    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>, SyncError> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Dir)),
            Ok(meta) if meta.is_file() => Ok(Some(EntryKind::File)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::from_io(path, e)),
        }
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<u64, SyncError> {
        // 先写入同目录的临时文件，再原子重命名到目标名，
        // 避免中途失败在副本里留下截断的文件
        let temp_name = format!(
            ".{}.{}.tmp",
            to.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            std::process::id()
        );
        let temp_path = to.with_file_name(temp_name);

        let bytes = match fs::copy(from, &temp_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(SyncError::from_io(from, e));
            }
        };

        if let Err(e) = fs::rename(&temp_path, to).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SyncError::from_io(to, e));
        }

        Ok(bytes)
    }

    async fn create_dir(&self, path: &Path) -> Result<(), SyncError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| SyncError::from_io(path, e))
    }

    async fn remove_file(&self, path: &Path) -> Result<(), SyncError> {
        fs::remove_file(path)
            .await
            .map_err(|e| SyncError::from_io(path, e))
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), SyncError> {
        fs::remove_dir_all(path)
            .await
            .map_err(|e| SyncError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn list_dir_splits_kinds() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let store = LocalFileStore::new();
        let mut entries = store.list_dir(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[1].name, "sub");
        assert_eq!(entries[1].kind, EntryKind::Dir);
    }

    #[tokio::test]
    async fn list_dir_missing_is_not_found() {
        let store = LocalFileStore::new();
        let err = store
            .list_dir(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(err.is_benign());
    }

    #[tokio::test]
    async fn copy_file_reports_bytes_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("src.bin");
        let to = dir.path().join("dst.bin");
        std::fs::write(&from, b"hello").unwrap();

        let store = LocalFileStore::new();
        let bytes = store.copy_file(&from, &to).await.unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(std::fs::read(&to).unwrap(), b"hello");
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn remove_file_on_missing_is_benign() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let err = store
            .remove_file(&dir.path().join("gone.txt"))
            .await
            .unwrap_err();
        assert!(err.is_benign());
    }

    #[tokio::test]
    async fn entry_kind_distinguishes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let store = LocalFileStore::new();

        assert_eq!(
            store.entry_kind(&dir.path().join("f")).await.unwrap(),
            Some(EntryKind::File)
        );
        assert_eq!(
            store.entry_kind(dir.path()).await.unwrap(),
            Some(EntryKind::Dir)
        );
        assert_eq!(store.entry_kind(&dir.path().join("nope")).await.unwrap(), None);
    }
}
