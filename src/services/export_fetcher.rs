//! 单版导出 - 业务能力层
//!
//! 只负责"把第 n 版拿下来"，不关心循环和合并

use tracing::{error, info};

use crate::error::{ExportError, ViewerError};
use crate::infrastructure::ViewerSession;
use crate::models::{Edition, PageArtifact};
use crate::services::artifact_store::ArtifactStore;

/// 单版导出服务
///
/// 职责：
/// - 选中版号、核对回读值、触发下载、落盘
/// - 版号不一致只记录不报错
/// - 等待超时不在这里处理，原样交给上层
pub struct ExportFetcher<'a> {
    store: &'a ArtifactStore,
}

impl<'a> ExportFetcher<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    /// 导出第 `page_index` 版
    ///
    /// # 返回
    /// - `Ok(PageArtifact)`：成功、版号不一致或阅读器取消下载
    /// - `Err(ExportError)`：超时或其他阅读器故障，整次运行应当终止
    pub async fn fetch_page<S>(
        &self,
        session: &S,
        edition: &Edition,
        page_index: usize,
        total_pages: usize,
    ) -> Result<PageArtifact, ExportError>
    where
        S: ViewerSession + ?Sized,
    {
        let selected = session
            .select_page(page_index)
            .await
            .map_err(|e| ExportError::from_viewer(page_index, e))?;

        if selected.trim() != page_index.to_string() {
            error!(
                "[第 {}/{} 版] ❌ 版号不一致: 期望 {}，实际 {}",
                page_index, total_pages, page_index, selected
            );
            return Ok(PageArtifact::mismatch(page_index));
        }

        let bytes = match session.export_current_page().await {
            Ok(bytes) => bytes,
            Err(ViewerError::DownloadCanceled { guid }) => {
                error!(
                    "[第 {}/{} 版] ❌ 阅读器取消了下载 ({})",
                    page_index, total_pages, guid
                );
                return Ok(PageArtifact::failed(page_index));
            }
            Err(e) => return Err(ExportError::from_viewer(page_index, e)),
        };

        let date = edition.date_str();
        let path = self
            .store
            .save_page(&date, page_index, &bytes)
            .await
            .map_err(|source| ExportError::Io {
                page: page_index,
                source,
            })?;

        info!("[第 {}/{} 版] ✅ 下载成功", page_index, total_pages);
        Ok(PageArtifact::ok(page_index, bytes, Some(path)))
    }
}
