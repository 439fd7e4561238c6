/// Slack 文件上传 API 客户端
///
/// 封装外部上传的三步调用：获取上传地址 → 上传字节 → 完成上传
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::DistributionFailure;

/// 第一步返回的上传目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub upload_url: String,
    pub file_id: String,
}

/// 完成上传后 Slack 返回的文件
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadTargetResponse {
    ok: bool,
    upload_url: Option<String>,
    file_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteUploadResponse {
    ok: bool,
    #[serde(default)]
    files: Vec<UploadedFile>,
    error: Option<String>,
}

/// Slack API 客户端
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// 第一步：申请上传地址
    ///
    /// # 参数
    /// - `filename`: 文件名
    /// - `length`: 文件字节数
    pub async fn get_upload_target(
        &self,
        filename: &str,
        length: usize,
    ) -> Result<UploadTarget, DistributionFailure> {
        let url = format!("{}/files.getUploadURLExternal", self.base_url);
        let response: UploadTargetResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[("filename", filename.to_string()), ("length", length.to_string())])
            .send()
            .await?
            .json()
            .await?;

        debug!("获取上传地址结果: {:?}", response);

        if !response.ok {
            return Err(DistributionFailure::UploadTargetRejected(
                response
                    .error
                    .unwrap_or_else(|| "Failed to get upload URL".to_string()),
            ));
        }

        let upload_url = response
            .upload_url
            .ok_or(DistributionFailure::MissingField("upload_url"))?;
        let file_id = response
            .file_id
            .ok_or(DistributionFailure::MissingField("file_id"))?;

        Ok(UploadTarget {
            upload_url,
            file_id,
        })
    }

    /// 第二步：把字节以表单文件的形式上传到上传地址
    pub async fn upload_bytes(
        &self,
        upload_url: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DistributionFailure> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self.http.post(upload_url).multipart(form).send().await?;
        let status = response.status();
        debug!("上传文件结果: HTTP {}", status);

        if !status.is_success() {
            return Err(DistributionFailure::TransferRejected(status.as_u16()));
        }
        Ok(())
    }

    /// 第三步：把已上传的文件发到频道
    pub async fn complete_upload(
        &self,
        file_id: &str,
        title: &str,
        channel_id: &str,
        initial_comment: &str,
    ) -> Result<Vec<UploadedFile>, DistributionFailure> {
        let url = format!("{}/files.completeUploadExternal", self.base_url);
        let payload = json!({
            "files": [{ "id": file_id, "title": title }],
            "channel_id": channel_id,
            "initial_comment": initial_comment,
        });

        let response: CompleteUploadResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        debug!("完成上传结果: {:?}", response);

        if !response.ok {
            return Err(DistributionFailure::CompleteRejected(
                response
                    .error
                    .unwrap_or_else(|| "Failed to complete file upload".to_string()),
            ));
        }
        Ok(response.files)
    }
}
