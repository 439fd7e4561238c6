//! 逐版获取 - 流程层
//!
//! 按版号 1..=N 顺序调用 `ExportFetcher`，收集结果
//!
//! 阅读器的选择框只有一份，所以这里严格串行，绝不并发

use tracing::{debug, info, warn};

use crate::error::ExportError;
use crate::infrastructure::ViewerSession;
use crate::models::{Edition, PageStatus, RunResult};
use crate::services::ExportFetcher;

/// 逐版获取流程
pub struct PageSequencer<'a> {
    fetcher: ExportFetcher<'a>,
}

impl<'a> PageSequencer<'a> {
    pub fn new(fetcher: ExportFetcher<'a>) -> Self {
        Self { fetcher }
    }

    /// 获取整期报纸
    ///
    /// # 返回
    /// - 版号不一致、下载被取消：记录后继续下一版
    /// - 其他错误（包括超时）：立即返回，已获取的部分由调用方丢弃
    pub async fn run<S>(
        &self,
        session: &S,
        edition: &Edition,
        total_pages: usize,
    ) -> Result<RunResult, ExportError>
    where
        S: ViewerSession + ?Sized,
    {
        info!("📚 本期共 {} 版", total_pages);
        let mut result = RunResult::new(total_pages);

        for page_index in 1..=total_pages {
            info!("\n{}", "─".repeat(30));
            info!("📄 正在处理第 {}/{} 版...", page_index, total_pages);

            let artifact = self
                .fetcher
                .fetch_page(session, edition, page_index, total_pages)
                .await?;

            if artifact.status() != PageStatus::Ok {
                warn!(
                    "[第 {}/{} 版] ⚠️ 已跳过 ({:?})",
                    page_index,
                    total_pages,
                    artifact.status()
                );
            }
            result.push(artifact);
        }

        log_run_complete(&result);
        Ok(result)
    }
}

fn log_run_complete(result: &RunResult) {
    if result.acquired() < result.requested() {
        warn!(
            "⚠️ 只下载到 {}/{} 版 (版号不一致: {:?}, 失败: {:?})",
            result.acquired(),
            result.requested(),
            result.mismatched(),
            result.failed()
        );
    }
    info!("📥 下载完成，共 {} 个文件", result.acquired());
    for path in result.artifacts().iter().filter_map(|a| a.path()) {
        debug!("  {}", path.display());
    }
}
