//! 同步错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 同步过程中的错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 操作系统层面的 IO 失败（读取、写入、创建、删除）
    #[error("IO 操作失败 {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 条目在枚举之后、操作之前被外部删除
    #[error("条目已不存在: {}", .path.display())]
    NotFound { path: PathBuf },

    /// 对目录或其他非普通文件请求内容指纹
    #[error("不是普通文件: {}", .path.display())]
    NotAFile { path: PathBuf },

    /// 并发子任务异常退出
    #[error("后台任务异常退出: {0}")]
    TaskPanic(String),
}

impl SyncError {
    /// 将底层 IO 错误归类：NotFound 单独成类，便于上层容忍
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            SyncError::NotFound { path: path.into() }
        } else {
            SyncError::Io {
                path: path.into(),
                source,
            }
        }
    }

    /// 是否为可容忍的良性错误（条目消失属于正常的外部竞争）
    pub fn is_benign(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_benign() {
        let err = SyncError::from_io(
            "/tmp/gone",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SyncError::NotFound { .. }));
        assert!(err.is_benign());
    }

    #[test]
    fn permission_error_is_not_benign() {
        let err = SyncError::from_io(
            "/tmp/locked",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(!err.is_benign());
    }
}
