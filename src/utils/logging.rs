/// 日志工具模块
///
/// 提供日志初始化和横幅输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{DistributionOutcome, Edition};

/// 未设置 `RUST_LOG` 和 `LOG_LEVEL` 时的默认级别
const DEFAULT_LEVEL: &str = "info";

/// 初始化日志
///
/// 过滤规则优先取 `RUST_LOG`，其次 `LOG_LEVEL`，最后是 `info`。
/// 重复调用时静默忽略
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|level| EnvFilter::try_new(level).ok())
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 本次运行的配置
/// - `edition`: 要抓取的那一期
pub fn log_startup(config: &Config, edition: &Edition) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 报纸下载模式");
    info!("📅 日期: {}", edition.date_str());
    info!("🌐 阅读器: {}", config.newspaper_base_url);
    info!("📁 输出目录: {}", config.output_dir.display());
    match config.browser_debug_port {
        Some(port) => info!("🔌 连接已有浏览器，端口: {}", port),
        None => info!("🖥️ 启动无头浏览器"),
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `requested`: 总版数
/// - `acquired`: 下载成功的版数
/// - `mismatched`: 版号不一致被跳过的版
/// - `merged_from`: 参与合并的版号
/// - `merged_bytes`: 合并后 PDF 的字节数
/// - `outcome`: 发送结果
pub fn print_final_stats(
    requested: usize,
    acquired: usize,
    mismatched: &[usize],
    merged_from: &[usize],
    merged_bytes: usize,
    outcome: &DistributionOutcome,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 本期处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 下载成功: {}/{}", acquired, requested);
    if !mismatched.is_empty() {
        info!("⚠️ 版号不一致: {:?}", mismatched);
    }
    info!("📑 合并版号: {:?}", merged_from);
    info!("📄 合并文件大小: {} 字节", merged_bytes);
    match outcome {
        DistributionOutcome::Success { remote_id } => info!("💬 Slack: 已发送 ({})", remote_id),
        DistributionOutcome::Failure { reason } => info!("💬 Slack: 发送失败 ({})", reason),
    }
    info!("{}", "=".repeat(60));
}
