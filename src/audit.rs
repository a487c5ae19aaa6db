//! 变更审计
//!
//! 每一次实际完成的文件系统变更产生一条记录。并发任务把记录发进
//! 有界通道，由单一写入任务串行落到日志，互相之间不会交错。

use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// 新建目录
    Created,
    /// 复制文件
    Copied,
    /// 删除文件或目录
    Deleted,
}

/// 一条审计记录：变更类型加上被变更的绝对路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub path: PathBuf,
}

/// 审计写入端，可在并发任务间克隆
#[derive(Debug, Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditRecord>,
}

impl AuditSink {
    /// 创建通道两端。测试可以直接持有接收端观察记录流
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<AuditRecord>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// 记录一次已完成的变更。
    /// 接收端已关闭时静默丢弃，变更本身已经发生，不能再报错回滚。
    pub async fn record(&self, kind: AuditKind, path: impl Into<PathBuf>) {
        let _ = self
            .tx
            .send(AuditRecord {
                kind,
                path: path.into(),
            })
            .await;
    }
}

/// 启动串行写入任务，所有记录经由它逐条输出。
/// 全部发送端释放后任务自行结束。
pub fn spawn_writer(mut rx: mpsc::Receiver<AuditRecord>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match record.kind {
                AuditKind::Created => info!(target: "audit", "已创建: {}", record.path.display()),
                AuditKind::Copied => info!(target: "audit", "已复制: {}", record.path.display()),
                AuditKind::Deleted => info!(target: "audit", "已删除: {}", record.path.display()),
            }
        }
    })
}
