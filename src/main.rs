use clap::Parser;
use foldersync::audit::{self, AuditSink};
use foldersync::cli::Cli;
use foldersync::core::{ExcludeRules, SyncConfig, SyncEngine};
use foldersync::logging::{self, LogConfig};
use foldersync::storage::LocalFileStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&LogConfig {
        level: cli.log_level.clone(),
        file: cli.log_file.clone(),
        max_size_mb: cli.log_max_size,
    })?;

    let (source_root, replica_root) = cli.resolve_roots()?;

    let (audit_sink, audit_rx) = AuditSink::channel(1024);
    let audit_writer = audit::spawn_writer(audit_rx);

    let config = SyncConfig {
        max_parallel_ops: cli.workers,
        set_switch_threshold: cli.set_threshold,
        exclude: ExcludeRules::new(cli.exclude.clone()),
    };
    let engine = SyncEngine::new(
        source_root.clone(),
        replica_root.clone(),
        Arc::new(LocalFileStore::new()),
        audit_sink,
        config,
    );

    info!(
        "开始同步: {} -> {} (间隔 {} 秒)",
        source_root.display(),
        replica_root.display(),
        cli.interval
    );

    let mut last_failed = false;
    loop {
        match engine.run_pass().await {
            Ok(stats) => {
                if stats.mutations() == 0 {
                    info!(
                        "两侧已对齐, 无需变更 ({} 目录 {} 文件, 耗时 {}ms)",
                        stats.dirs_scanned, stats.files_scanned, stats.duration_ms
                    );
                }
                if cli.json {
                    println!("{}", serde_json::to_string(&stats)?);
                }
                last_failed = false;
            }
            Err(e) => {
                // 失败不终止进程，下一轮重新调和；已完成的变更本身幂等
                error!("同步失败: {}", e);
                last_failed = true;
            }
        }

        if cli.once {
            break;
        }

        // 只在两轮之间响应退出信号，调和过程不被打断
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cli.interval)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("收到退出信号, 停止同步");
                break;
            }
        }
    }

    // 释放引擎即关闭审计通道，等写入任务把剩余记录落盘
    drop(engine);
    let _ = audit_writer.await;

    if cli.once && last_failed {
        std::process::exit(1);
    }
    Ok(())
}
