//! 发送服务 - 业务能力层
//!
//! 把合并好的整期 PDF 发到 Slack 频道，结果总是以 `DistributionOutcome` 返回

use tracing::{error, info};

use crate::clients::SlackClient;
use crate::config::Config;
use crate::error::DistributionFailure;
use crate::models::{DistributionOutcome, MergedDocument};

/// 发送服务
///
/// 职责：
/// - 依次完成三步上传
/// - 任何一步失败都转成 `Failure`，从不返回错误
/// - 不负责重试，也不负责上传后的清理
pub struct Distributor {
    client: SlackClient,
    channel_id: String,
}

impl Distributor {
    pub fn new(config: &Config) -> Self {
        Self::with_client(
            SlackClient::new(&config.slack_api_base_url, &config.slack_bot_token),
            &config.slack_channel_id,
        )
    }

    pub fn with_client(client: SlackClient, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            channel_id: channel_id.into(),
        }
    }

    /// 上传文件到频道
    ///
    /// # 参数
    /// - `document`: 合并后的文档
    /// - `file_name`: 在频道里显示的文件名
    pub async fn distribute(
        &self,
        document: &MergedDocument,
        file_name: &str,
    ) -> DistributionOutcome {
        info!("💬 正在发送 PDF 到 Slack...");

        match self.upload(document, file_name).await {
            Ok(remote_id) => {
                info!("✅ PDF 已发送到 Slack");
                info!("📎 文件 ID: {}", remote_id);
                DistributionOutcome::Success { remote_id }
            }
            Err(reason) => {
                error!("❌ 发送 PDF 到 Slack 失败: {}", reason);
                DistributionOutcome::Failure { reason }
            }
        }
    }

    async fn upload(
        &self,
        document: &MergedDocument,
        file_name: &str,
    ) -> Result<String, DistributionFailure> {
        let target = self
            .client
            .get_upload_target(file_name, document.bytes.len())
            .await?;

        self.client
            .upload_bytes(&target.upload_url, file_name, document.bytes.clone())
            .await?;

        let comment = format!("📰 Daily Newspaper - {}", file_name);
        let files = self
            .client
            .complete_upload(&target.file_id, file_name, &self.channel_id, &comment)
            .await?;

        Ok(files
            .into_iter()
            .next()
            .map(|file| file.id)
            .unwrap_or(target.file_id))
    }
}
