//! 文件内容指纹
//!
//! 基于 BLAKE3 的全量内容哈希。指纹相等即认为内容一致，
//! 每次比较都重新读取两个文件，跨目录、跨轮次不做任何缓存。

use crate::core::SyncError;
use crate::storage::{EntryKind, FileStore};
use std::path::Path;

/// 文件内容指纹
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDigest(blake3::Hash);

impl ContentDigest {
    /// 十六进制表示，用于日志输出
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

/// 计算内存数据的指纹
pub fn digest_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest(blake3::hash(data))
}

/// 计算文件的全量内容指纹。路径必须指向普通文件
pub async fn fingerprint(store: &dyn FileStore, path: &Path) -> Result<ContentDigest, SyncError> {
    match store.entry_kind(path).await? {
        Some(EntryKind::File) => {}
        Some(EntryKind::Dir) => {
            return Err(SyncError::NotAFile {
                path: path.to_path_buf(),
            })
        }
        None => {
            return Err(SyncError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }
    let data = store.read(path).await?;
    Ok(digest_bytes(&data))
}

/// 判断两个普通文件的内容是否一致
pub async fn contents_equal(
    store: &dyn FileStore,
    a: &Path,
    b: &Path,
) -> Result<bool, SyncError> {
    Ok(fingerprint(store, a).await? == fingerprint(store, b).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStore;
    use tempfile::TempDir;

    #[test]
    fn same_bytes_same_digest() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
        assert_eq!(digest_bytes(b"abc").to_hex().len(), 64);
    }

    #[tokio::test]
    async fn equal_content_different_names() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let store = LocalFileStore::new();
        assert!(contents_equal(&store, &a, &b).await.unwrap());
    }

    #[tokio::test]
    async fn different_content_detected() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"one").unwrap();
        std::fs::write(&b, b"two").unwrap();

        let store = LocalFileStore::new();
        assert!(!contents_equal(&store, &a, &b).await.unwrap());
    }

    #[tokio::test]
    async fn directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let err = fingerprint(&store, dir.path()).await.unwrap_err();
        assert!(matches!(err, SyncError::NotAFile { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let err = fingerprint(&store, &dir.path().join("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }
}
