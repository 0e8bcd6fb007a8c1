//! 日志工具模块
//!
//! 提供日志初始化和统计输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::SweepStats;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug 或 info。重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 签署服务启动");
    info!("📁 上传目录: {}", config.upload_dir.display());
    match &config.state_file {
        Some(path) => info!("💾 存储快照: {}", path.display()),
        None => info!("💾 存储快照: 未启用（仅内存）"),
    }
    info!(
        "🔒 结束签署前检查签署人: {}",
        if config.enforce_signer_completion { "是" } else { "否" }
    );
    info!("{}", "=".repeat(60));
}

/// 打印孤立文件清理统计
pub fn print_sweep_stats(stats: &SweepStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 孤立文件清理完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 扫描: {} (保留 {})", stats.scanned, stats.kept);
    info!("✅ 删除: {}", stats.removed);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("目录: {}", config.upload_dir.display());
}
