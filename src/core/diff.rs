//! 目录差异分类
//!
//! 对同一层级的源条目和副本条目做名称比较，产出该层的删除、
//! 校验、复制决定。成员判定按条目类型分开：文件只和文件比，
//! 目录只和目录比，同名异类的条目自然归入删除加重建。

use crate::storage::{EntryInfo, EntryKind};
use std::collections::HashSet;

/// 名称集合切换哈希表示的默认基数阈值
pub const DEFAULT_SET_SWITCH_THRESHOLD: usize = 20;

/// 目录条目名称集合。
/// 小集合用线性扫描，大集合换 HashSet，两种表示的判定结果完全一致，
/// 区别只在查找开销。
pub struct EntryNameSet {
    repr: Repr,
}

enum Repr {
    Linear(Vec<String>),
    Hashed(HashSet<String>),
}

impl EntryNameSet {
    /// 按基数选择内部表示：超过阈值用哈希，否则保持线性
    pub fn new(names: Vec<String>, threshold: usize) -> Self {
        let repr = if names.len() > threshold {
            Repr::Hashed(names.into_iter().collect())
        } else {
            Repr::Linear(names)
        };
        Self { repr }
    }

    pub fn contains(&self, name: &str) -> bool {
        match &self.repr {
            Repr::Linear(names) => names.iter().any(|n| n == name),
            Repr::Hashed(names) => names.contains(name),
        }
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Linear(names) => names.len(),
            Repr::Hashed(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 单层目录列举结果，按条目类型拆开的名称列表
#[derive(Debug, Clone, Default)]
pub struct DirListing {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

impl DirListing {
    pub fn from_entries(entries: Vec<EntryInfo>) -> Self {
        let mut listing = DirListing::default();
        for entry in entries {
            match entry.kind {
                EntryKind::File => listing.files.push(entry.name),
                EntryKind::Dir => listing.dirs.push(entry.name),
            }
        }
        listing
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

/// 一个目录层级的分类结果
#[derive(Debug, Default)]
pub struct DirDiff {
    /// 源侧已不存在同名文件，待删除的副本文件
    pub stale_files: Vec<String>,
    /// 两侧同名的文件，待做内容校验
    pub verify_files: Vec<String>,
    /// 全部源文件。复制步骤自身幂等（已存在的目标跳过），
    /// 所以这里不预判哪些缺失
    pub copy_files: Vec<String>,
    /// 源侧已不存在同名目录，待递归删除的副本子目录
    pub stale_dirs: Vec<String>,
    /// 副本侧尚不存在的源子目录（新子树）
    pub fresh_dirs: Vec<String>,
    /// 两侧都存在的子目录
    pub existing_dirs: Vec<String>,
}

/// 对一个目录层级做名称分类
pub fn classify_dir(source: &DirListing, replica: &DirListing, threshold: usize) -> DirDiff {
    let source_files = EntryNameSet::new(source.files.clone(), threshold);
    let source_dirs = EntryNameSet::new(source.dirs.clone(), threshold);
    let replica_dirs = EntryNameSet::new(replica.dirs.clone(), threshold);

    let mut diff = DirDiff::default();

    for name in &replica.files {
        if source_files.contains(name) {
            diff.verify_files.push(name.clone());
        } else {
            diff.stale_files.push(name.clone());
        }
    }

    for name in &replica.dirs {
        if !source_dirs.contains(name) {
            diff.stale_dirs.push(name.clone());
        }
    }

    diff.copy_files = source.files.clone();

    for name in &source.dirs {
        if replica_dirs.contains(name) {
            diff.existing_dirs.push(name.clone());
        } else {
            diff.fresh_dirs.push(name.clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(files: &[&str], dirs: &[&str]) -> DirListing {
        DirListing {
            files: files.iter().map(|s| s.to_string()).collect(),
            dirs: dirs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn stale_entries_are_deleted_fresh_dirs_detected() {
        let source = listing(&["a.txt", "b.txt"], &["keep", "new"]);
        let replica = listing(&["a.txt", "old.txt"], &["keep", "dead"]);

        let diff = classify_dir(&source, &replica, DEFAULT_SET_SWITCH_THRESHOLD);

        assert_eq!(diff.stale_files, vec!["old.txt"]);
        assert_eq!(diff.verify_files, vec!["a.txt"]);
        assert_eq!(diff.copy_files, vec!["a.txt", "b.txt"]);
        assert_eq!(diff.stale_dirs, vec!["dead"]);
        assert_eq!(diff.fresh_dirs, vec!["new"]);
        assert_eq!(diff.existing_dirs, vec!["keep"]);
    }

    #[test]
    fn empty_source_deletes_everything() {
        let source = listing(&[], &[]);
        let replica = listing(&["x", "y"], &["d"]);

        let diff = classify_dir(&source, &replica, DEFAULT_SET_SWITCH_THRESHOLD);

        assert_eq!(diff.stale_files, vec!["x", "y"]);
        assert_eq!(diff.stale_dirs, vec!["d"]);
        assert!(diff.verify_files.is_empty());
        assert!(diff.copy_files.is_empty());
        assert!(diff.fresh_dirs.is_empty());
        assert!(diff.existing_dirs.is_empty());
    }

    #[test]
    fn kind_mismatch_splits_into_delete_and_recreate() {
        // 源侧 x 是文件，副本侧 x 是目录：目录删除，文件照常复制
        let source = listing(&["x"], &[]);
        let replica = listing(&[], &["x"]);

        let diff = classify_dir(&source, &replica, DEFAULT_SET_SWITCH_THRESHOLD);

        assert_eq!(diff.stale_dirs, vec!["x"]);
        assert_eq!(diff.copy_files, vec!["x"]);
        assert!(diff.stale_files.is_empty());
        assert!(diff.fresh_dirs.is_empty());
    }

    #[test]
    fn representation_switch_does_not_change_results() {
        let names: Vec<String> = (0..100).map(|i| format!("f{:03}.dat", i)).collect();
        let source = DirListing {
            files: names.clone(),
            dirs: (0..30).map(|i| format!("d{}", i)).collect(),
        };
        let mut replica = source.clone();
        replica.files.push("stale.bin".to_string());
        replica.dirs.push("dead".to_string());

        // 阈值 0 强制哈希表示，阈值 usize::MAX 强制线性表示
        let hashed = classify_dir(&source, &replica, 0);
        let linear = classify_dir(&source, &replica, usize::MAX);

        assert_eq!(hashed.stale_files, linear.stale_files);
        assert_eq!(hashed.verify_files, linear.verify_files);
        assert_eq!(hashed.copy_files, linear.copy_files);
        assert_eq!(hashed.stale_dirs, linear.stale_dirs);
        assert_eq!(hashed.fresh_dirs, linear.fresh_dirs);
        assert_eq!(hashed.existing_dirs, linear.existing_dirs);
    }

    #[test]
    fn name_set_boundary_is_strictly_greater() {
        // 基数等于阈值时仍是线性表示，判定结果不受影响
        let names: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let set = EntryNameSet::new(names, 20);
        assert_eq!(set.len(), 20);
        assert!(set.contains("0"));
        assert!(set.contains("19"));
        assert!(!set.contains("20"));
    }
}
