//! 同步引擎
//!
//! 显式工作栈驱动的单向目录同步：每个工作项对应一个待调和的源目录，
//! 弹栈时现场推导对应的副本路径并处理该层，子目录再入栈。
//! 一次 `run_pass` 调和整棵树，本身不做任何跨轮次的状态记忆，
//! 轮次之间的幂等完全来自每层的重新判定。

use crate::audit::AuditSink;
use crate::core::diff::{classify_dir, DirListing, DEFAULT_SET_SWITCH_THRESHOLD};
use crate::core::exclude::ExcludeRules;
use crate::core::executor::{ActionExecutor, CopyPolicy};
use crate::core::hasher;
use crate::core::SyncError;
use crate::storage::{EntryKind, FileStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 单个目录内删除或复制任务的最大并发数
    pub max_parallel_ops: usize,
    /// 名称集合切换哈希表示的基数阈值
    pub set_switch_threshold: usize,
    /// 排除规则，命中的条目两侧都不可见
    pub exclude: ExcludeRules,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_parallel_ops: 4, // 默认并行数为4
            set_switch_threshold: DEFAULT_SET_SWITCH_THRESHOLD,
            exclude: ExcludeRules::default(),
        }
    }
}

/// 工作项：一个待调和的源目录。
/// 新旧标记在入栈时判定，处理逻辑据此分流
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// 副本侧尚不存在的目录。跳过差异分类，整层无条件复制，
    /// 这样的子树里绝不会产生删除
    Fresh(PathBuf),
    /// 副本侧已存在的目录。先差异分类，再删除、再补齐
    Existing(PathBuf),
}

impl WorkItem {
    pub fn source_dir(&self) -> &Path {
        match self {
            WorkItem::Fresh(p) | WorkItem::Existing(p) => p,
        }
    }
}

/// 一次同步的统计报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub started_at: i64,
    pub finished_at: i64,
    pub duration_ms: u64,
    pub dirs_scanned: u64,
    pub files_scanned: u64,
    pub dirs_created: u64,
    pub files_copied: u64,
    pub entries_deleted: u64,
    pub files_unchanged: u64,
    pub entries_excluded: u64,
    pub missing_tolerated: u64,
    pub bytes_copied: u64,
}

impl SyncStats {
    /// 本次同步实际执行的变更总数，为零即两侧已对齐
    pub fn mutations(&self) -> u64 {
        self.dirs_created + self.files_copied + self.entries_deleted
    }
}

/// 同步引擎。持有源根、副本根和文件存储，
/// 每次 `run_pass` 把副本树调和成源树的镜像
pub struct SyncEngine {
    source_root: PathBuf,
    replica_root: PathBuf,
    store: Arc<dyn FileStore>,
    executor: ActionExecutor,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        store: Arc<dyn FileStore>,
        audit: AuditSink,
        config: SyncConfig,
    ) -> Self {
        let executor = ActionExecutor::new(store.clone(), audit, config.max_parallel_ops);
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            store,
            executor,
            config,
        }
    }

    /// 由源目录路径推导对应的副本目录路径。
    /// 每次弹栈重新计算，任何地方都不缓存配对关系
    fn replica_path(&self, source_path: &Path) -> PathBuf {
        let rel = source_path
            .strip_prefix(&self.source_root)
            .unwrap_or(Path::new(""));
        if rel.as_os_str().is_empty() {
            self.replica_root.clone()
        } else {
            self.replica_root.join(rel)
        }
    }

    /// 执行一次完整同步
    pub async fn run_pass(&self) -> Result<SyncStats, SyncError> {
        let started = Instant::now();
        let mut stats = SyncStats {
            started_at: chrono::Utc::now().timestamp(),
            ..Default::default()
        };

        // 源根必须是已存在的目录
        match self.store.entry_kind(&self.source_root).await? {
            Some(EntryKind::Dir) => {}
            Some(EntryKind::File) => {
                return Err(SyncError::Io {
                    path: self.source_root.clone(),
                    source: std::io::Error::other("源路径不是目录"),
                })
            }
            None => {
                return Err(SyncError::NotFound {
                    path: self.source_root.clone(),
                })
            }
        }

        // 副本根缺失时由本轮创建；根目录的新旧只在这里判定一次，
        // 之后的遍历不会再创建根
        let root_fresh = match self.store.entry_kind(&self.replica_root).await? {
            Some(EntryKind::Dir) => self.store.list_dir(&self.replica_root).await?.is_empty(),
            Some(EntryKind::File) => {
                return Err(SyncError::Io {
                    path: self.replica_root.clone(),
                    source: std::io::Error::other("副本路径不是目录"),
                })
            }
            None => {
                if self.executor.create_dir(&self.replica_root).await? {
                    stats.dirs_created += 1;
                }
                true
            }
        };

        let seed = if root_fresh {
            WorkItem::Fresh(self.source_root.clone())
        } else {
            WorkItem::Existing(self.source_root.clone())
        };
        debug!("播种工作栈: {:?}", seed);

        let mut stack = vec![seed];
        while let Some(item) = stack.pop() {
            match item {
                WorkItem::Fresh(dir) => self.process_fresh(&dir, &mut stack, &mut stats).await?,
                WorkItem::Existing(dir) => {
                    self.process_existing(&dir, &mut stack, &mut stats).await?
                }
            }
        }

        stats.finished_at = chrono::Utc::now().timestamp();
        stats.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "同步完成: 扫描 {} 目录 {} 文件, 新建目录 {}, 复制 {}, 删除 {}, 跳过未变 {}, 耗时 {}ms",
            stats.dirs_scanned,
            stats.files_scanned,
            stats.dirs_created,
            stats.files_copied,
            stats.entries_deleted,
            stats.files_unchanged,
            stats.duration_ms
        );

        Ok(stats)
    }

    /// 列举目录并应用排除规则。目录在遍历中途消失时返回 None，
    /// 该层跳过，下一轮由父目录的差异重新处理
    async fn list_filtered(
        &self,
        dir: &Path,
        root: &Path,
        stats: &mut SyncStats,
    ) -> Result<Option<DirListing>, SyncError> {
        let entries = match self.store.list_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_benign() => {
                warn!("目录在遍历中途消失: {}", dir.display());
                stats.missing_tolerated += 1;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if self.config.exclude.is_empty() {
            return Ok(Some(DirListing::from_entries(entries)));
        }

        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            let rel = rel_display(&dir.join(&entry.name), root);
            if self.config.exclude.is_excluded(&rel) {
                debug!("排除: {}", rel);
                stats.entries_excluded += 1;
            } else {
                kept.push(entry);
            }
        }
        Ok(Some(DirListing::from_entries(kept)))
    }

    /// 处理副本侧不存在的目录：建目录，整层复制，子目录全部按新子树入栈。
    /// 全程没有差异分类，也绝不会触发删除
    async fn process_fresh(
        &self,
        source_dir: &Path,
        stack: &mut Vec<WorkItem>,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let replica_dir = self.replica_path(source_dir);

        // 根目录在播种前已保证存在，不重复创建
        if source_dir != self.source_root && self.executor.create_dir(&replica_dir).await? {
            stats.dirs_created += 1;
        }

        let listing = match self.list_filtered(source_dir, &self.source_root, stats).await? {
            Some(listing) => listing,
            None => return Ok(()),
        };

        stats.dirs_scanned += 1;
        stats.files_scanned += listing.files.len() as u64;

        if !listing.files.is_empty() {
            let pairs = listing
                .files
                .iter()
                .map(|name| (source_dir.join(name), replica_dir.join(name)))
                .collect();
            let outcome = self.executor.copy_batch(pairs, CopyPolicy::Always).await?;
            stats.files_copied += outcome.completed;
            stats.bytes_copied += outcome.bytes;
            stats.missing_tolerated += outcome.missing;
        }

        for name in &listing.dirs {
            stack.push(WorkItem::Fresh(source_dir.join(name)));
        }

        Ok(())
    }

    /// 处理两侧都存在的目录：名称分类、内容校验、先删除后补齐，
    /// 最后把子目录按新旧入栈
    async fn process_existing(
        &self,
        source_dir: &Path,
        stack: &mut Vec<WorkItem>,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let replica_dir = self.replica_path(source_dir);

        let source_listing = match self.list_filtered(source_dir, &self.source_root, stats).await? {
            Some(listing) => listing,
            None => return Ok(()),
        };
        let replica_listing = match self
            .list_filtered(&replica_dir, &self.replica_root, stats)
            .await?
        {
            Some(listing) => listing,
            // 副本目录被外部删掉：本轮跳过，下一轮按新子树重建
            None => return Ok(()),
        };

        stats.dirs_scanned += 1;
        stats.files_scanned += source_listing.files.len() as u64;

        let mut diff = classify_dir(
            &source_listing,
            &replica_listing,
            self.config.set_switch_threshold,
        );

        // 内容校验：两侧同名的文件逐个比指纹，
        // 不一致的归入删除名单，随后由复制批重新写入
        for name in std::mem::take(&mut diff.verify_files) {
            let src = source_dir.join(&name);
            let dst = replica_dir.join(&name);
            match hasher::contents_equal(self.store.as_ref(), &src, &dst).await {
                Ok(true) => stats.files_unchanged += 1,
                Ok(false) => {
                    debug!("内容不一致: {}", dst.display());
                    diff.stale_files.push(name);
                }
                Err(e) if e.is_benign() => {
                    warn!("校验时文件已消失: {}", src.display());
                    stats.missing_tolerated += 1;
                }
                Err(e) => return Err(e),
            }
        }

        // 删除批先完成，复制批才开始，同名路径不会两边同时动
        if !diff.stale_files.is_empty() || !diff.stale_dirs.is_empty() {
            let mut targets: Vec<(PathBuf, EntryKind)> =
                Vec::with_capacity(diff.stale_files.len() + diff.stale_dirs.len());
            targets.extend(
                diff.stale_files
                    .iter()
                    .map(|name| (replica_dir.join(name), EntryKind::File)),
            );
            targets.extend(
                diff.stale_dirs
                    .iter()
                    .map(|name| (replica_dir.join(name), EntryKind::Dir)),
            );
            let outcome = self.executor.delete_batch(targets).await?;
            stats.entries_deleted += outcome.completed;
            stats.missing_tolerated += outcome.missing;
        }

        if !diff.copy_files.is_empty() {
            let pairs = diff
                .copy_files
                .iter()
                .map(|name| (source_dir.join(name), replica_dir.join(name)))
                .collect();
            let outcome = self
                .executor
                .copy_batch(pairs, CopyPolicy::SkipExisting)
                .await?;
            stats.files_copied += outcome.completed;
            stats.bytes_copied += outcome.bytes;
            stats.missing_tolerated += outcome.missing;
        }

        for name in &diff.fresh_dirs {
            stack.push(WorkItem::Fresh(source_dir.join(name)));
        }
        for name in &diff.existing_dirs {
            stack.push(WorkItem::Existing(source_dir.join(name)));
        }

        Ok(())
    }
}

/// 根目录相对路径的展示形式，分隔符统一为 `/`
fn rel_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
