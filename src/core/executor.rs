//! 变更执行
//!
//! 删除和复制按批次并发执行，批内由信号量限制并发度，
//! 批与批之间严格串行：一批全部结束才开始下一批。
//! 删除批先于复制批，同名路径不会出现删除与复制并行。

use crate::audit::{AuditKind, AuditSink};
use crate::core::SyncError;
use crate::storage::{EntryKind, FileStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 复制策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPolicy {
    /// 目标已存在时跳过，不读不写（幂等补齐）
    SkipExisting,
    /// 无条件写入（目标树尚不存在，例如新子树）
    Always,
}

/// 一批并发操作的汇总结果
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchOutcome {
    /// 实际完成的变更数
    pub completed: u64,
    /// 因目标已存在而跳过的复制数
    pub skipped: u64,
    /// 条目中途消失被容忍的次数
    pub missing: u64,
    /// 复制写入的字节数
    pub bytes: u64,
}

enum TaskOutcome {
    Done(u64),
    Skipped,
    Missing,
    Failed(SyncError),
}

/// 变更执行器。持有文件存储、审计写入端和并发信号量
pub struct ActionExecutor {
    store: Arc<dyn FileStore>,
    audit: AuditSink,
    semaphore: Arc<Semaphore>,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn FileStore>, audit: AuditSink, max_parallel_ops: usize) -> Self {
        Self {
            store,
            audit,
            semaphore: Arc::new(Semaphore::new(max_parallel_ops.max(1))),
        }
    }

    /// 创建副本目录。已存在同名目录时是空操作，返回是否实际创建。
    /// 路径被文件占用时由底层返回 IO 错误
    pub async fn create_dir(&self, path: &Path) -> Result<bool, SyncError> {
        if let Some(EntryKind::Dir) = self.store.entry_kind(path).await? {
            return Ok(false);
        }
        self.store.create_dir(path).await?;
        self.audit.record(AuditKind::Created, path).await;
        Ok(true)
    }

    /// 并发删除一批副本条目，全部结束后才返回。
    /// 目录按递归删除处理；条目已消失记为良性
    pub async fn delete_batch(
        &self,
        targets: Vec<(PathBuf, EntryKind)>,
    ) -> Result<BatchOutcome, SyncError> {
        let mut handles: Vec<JoinHandle<TaskOutcome>> = Vec::with_capacity(targets.len());

        for (path, kind) in targets {
            let permit = self.semaphore.clone().acquire_owned().await.unwrap();
            let store = self.store.clone();
            let audit = self.audit.clone();

            let handle = tokio::spawn(async move {
                let result = match kind {
                    EntryKind::Dir => store.remove_dir_all(&path).await,
                    EntryKind::File => store.remove_file(&path).await,
                };

                let outcome = match result {
                    Ok(()) => {
                        debug!("删除: {}", path.display());
                        audit.record(AuditKind::Deleted, &path).await;
                        TaskOutcome::Done(0)
                    }
                    Err(e) if e.is_benign() => {
                        warn!("删除时条目已消失: {}", path.display());
                        TaskOutcome::Missing
                    }
                    Err(e) => TaskOutcome::Failed(e),
                };

                drop(permit);
                outcome
            });

            handles.push(handle);
        }

        Self::drain(handles).await
    }

    /// 并发复制一批文件（源绝对路径到副本绝对路径），全部结束后才返回。
    /// 源文件已消失记为良性
    pub async fn copy_batch(
        &self,
        pairs: Vec<(PathBuf, PathBuf)>,
        policy: CopyPolicy,
    ) -> Result<BatchOutcome, SyncError> {
        let mut handles: Vec<JoinHandle<TaskOutcome>> = Vec::with_capacity(pairs.len());

        for (from, to) in pairs {
            let permit = self.semaphore.clone().acquire_owned().await.unwrap();
            let store = self.store.clone();
            let audit = self.audit.clone();

            let handle = tokio::spawn(async move {
                if policy == CopyPolicy::SkipExisting {
                    match store.exists(&to).await {
                        // 目标已存在即视为已对齐，内容校验在此之前已做过
                        Ok(true) => {
                            drop(permit);
                            return TaskOutcome::Skipped;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            drop(permit);
                            return TaskOutcome::Failed(e);
                        }
                    }
                }

                let outcome = match store.copy_file(&from, &to).await {
                    Ok(bytes) => {
                        debug!("复制: {} -> {} ({} 字节)", from.display(), to.display(), bytes);
                        audit.record(AuditKind::Copied, &to).await;
                        TaskOutcome::Done(bytes)
                    }
                    Err(e) if e.is_benign() => {
                        warn!("复制时源文件已消失: {}", from.display());
                        TaskOutcome::Missing
                    }
                    Err(e) => TaskOutcome::Failed(e),
                };

                drop(permit);
                outcome
            });

            handles.push(handle);
        }

        Self::drain(handles).await
    }

    /// 等待一批任务全部结束，汇总结果。
    /// 出现失败时仍然等完整批，返回第一个错误
    async fn drain(handles: Vec<JoinHandle<TaskOutcome>>) -> Result<BatchOutcome, SyncError> {
        let mut outcome = BatchOutcome::default();
        let mut first_error = None;

        for handle in handles {
            match handle.await {
                Ok(TaskOutcome::Done(bytes)) => {
                    outcome.completed += 1;
                    outcome.bytes += bytes;
                }
                Ok(TaskOutcome::Skipped) => outcome.skipped += 1,
                Ok(TaskOutcome::Missing) => outcome.missing += 1,
                Ok(TaskOutcome::Failed(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(SyncError::TaskPanic(e.to_string()));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }
}
