//! 命令行参数

use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;

/// 单向文件夹同步工具：周期性地把副本目录调和成源目录的镜像
#[derive(Debug, Parser)]
#[command(name = "foldersync", version, about)]
pub struct Cli {
    /// 源目录（只读，永不被修改）
    pub source: PathBuf,

    /// 副本目录（调和目标，不存在时自动创建）
    pub replica: PathBuf,

    /// 两次同步之间的间隔秒数
    #[arg(short, long, default_value_t = 30)]
    pub interval: u64,

    /// 只执行一次同步后退出
    #[arg(long)]
    pub once: bool,

    /// 日志文件路径（不指定则只输出到控制台）
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// 日志级别: error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// 日志文件大小上限（MB），超过后轮转为 .old
    #[arg(long, default_value_t = 5)]
    pub log_max_size: u32,

    /// 单个目录内删除或复制的最大并发数
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// 目录条目超过该数量时名称查找改用哈希集合
    #[arg(long, default_value_t = 20)]
    pub set_threshold: usize,

    /// 排除规则，可重复指定（如 --exclude '*.tmp' --exclude '.git/**'）
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// 每次同步结束后向标准输出打印 JSON 统计报告
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// 校验两个根目录并归一化为绝对路径。
    /// 源必须是已存在的目录；两个根互相嵌套时拒绝启动
    pub fn resolve_roots(&self) -> anyhow::Result<(PathBuf, PathBuf)> {
        if !self.source.is_dir() {
            bail!("源目录不存在或不是目录: {}", self.source.display());
        }

        let source = std::fs::canonicalize(&self.source)?;
        // 副本可能尚不存在，只能做词法归一化
        let replica = match std::fs::canonicalize(&self.replica) {
            Ok(path) => path,
            Err(_) => std::path::absolute(&self.replica)?,
        };

        if replica.starts_with(&source) || source.starts_with(&replica) {
            bail!(
                "源目录与副本目录不能相同或互相嵌套: {} / {}",
                source.display(),
                replica.display()
            );
        }

        Ok((source, replica))
    }
}
