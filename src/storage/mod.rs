//! 文件系统抽象层
//!
//! 同步核心只通过 `FileStore` 接口访问源树和副本树，
//! 所有路径均为绝对路径，列举只做单层展开。

pub mod local;

pub use local::LocalFileStore;

use crate::core::SyncError;
use async_trait::async_trait;
use std::path::Path;

/// 目录条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// 单层目录列举得到的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// 条目名（不含路径）
    pub name: String,
    pub kind: EntryKind,
}

/// 文件树的读写能力
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 列举单层目录条目（名字和类型，不递归）
    async fn list_dir(&self, dir: &Path) -> Result<Vec<EntryInfo>, SyncError>;

    /// 读取整个文件内容
    async fn read(&self, path: &Path) -> Result<Vec<u8>, SyncError>;

    /// 查询条目类型，不存在时返回 None
    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>, SyncError>;

    /// 复制单个文件，返回复制的字节数
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<u64, SyncError>;

    /// 创建目录（连同缺失的父目录）
    async fn create_dir(&self, path: &Path) -> Result<(), SyncError>;

    /// 删除单个文件
    async fn remove_file(&self, path: &Path) -> Result<(), SyncError>;

    /// 递归删除目录及其全部内容
    async fn remove_dir_all(&self, path: &Path) -> Result<(), SyncError>;

    /// 检查条目是否存在
    async fn exists(&self, path: &Path) -> Result<bool, SyncError> {
        Ok(self.entry_kind(path).await?.is_some())
    }
}
