use anyhow::Result;
use odiya_news::utils::logging;
use odiya_news::{App, Config, DistributionOutcome};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置（缺少凭据时在启动浏览器之前就失败）
    let config = Config::load()?;

    // 初始化并运行应用
    let summary = App::initialize(config).run().await?;

    // 发送失败只报告，不影响退出码
    if let DistributionOutcome::Failure { reason } = &summary.outcome {
        error!(
            "❌ PDF 未能发送到 Slack: {}，文件保留在 {}",
            reason,
            summary.merged_path.display()
        );
    }

    Ok(())
}
