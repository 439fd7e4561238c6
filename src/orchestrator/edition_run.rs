//! 单期报纸处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整运行和资源管理。
//!
//! ## 核心功能
//!
//! 1. **准备输出目录**：创建目录并清掉上次残留的文件
//! 2. **会话管理**：启动阅读器，无论成败都只关闭一次
//! 3. **逐版下载**：委托 `NavigationController` 和 `PageSequencer`
//! 4. **合并与发送**：委托 `Assembler` 和 `Distributor`
//! 5. **清理策略**：只有发送成功才清空输出目录
//! 6. **全局统计**：输出本次运行的汇总
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单版导出的细节
//! - **资源所有者**：唯一持有阅读器会话的模块

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{ChromeLauncher, ViewerLauncher, ViewerSession};
use crate::models::{DistributionOutcome, Edition, RunResult};
use crate::services::{ArtifactStore, Assembler, Distributor, ExportFetcher};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::{NavigationController, PageSequencer};

/// 一次运行的汇总
#[derive(Debug)]
pub struct RunSummary {
    pub requested: usize,
    pub acquired: usize,
    pub mismatched: Vec<usize>,
    /// 合并文档的页数
    pub merged_pages: usize,
    /// 参与合并的版号，按合并顺序
    pub merged_from: Vec<usize>,
    pub merged_path: PathBuf,
    pub outcome: DistributionOutcome,
}

/// 应用主结构
pub struct App<L = ChromeLauncher> {
    config: Config,
    launcher: L,
    navigation: NavigationController,
    store: ArtifactStore,
    distributor: Distributor,
}

impl App<ChromeLauncher> {
    /// 使用 Chromium 阅读器初始化应用
    pub fn initialize(config: Config) -> Self {
        let launcher = ChromeLauncher::new(&config);
        Self::with_launcher(config, launcher)
    }
}

impl<L: ViewerLauncher> App<L> {
    pub fn with_launcher(config: Config, launcher: L) -> Self {
        Self {
            navigation: NavigationController::new(&config),
            store: ArtifactStore::new(config.output_dir.clone()),
            distributor: Distributor::new(&config),
            launcher,
            config,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 发送失败不算错误，结果放在 `RunSummary::outcome` 里，由调用方决定退出码
    pub async fn run(&self) -> AppResult<RunSummary> {
        let edition = match self.config.edition_date {
            Some(date) => Edition::new(date, &self.config.newspaper_base_url),
            None => Edition::today(&self.config.newspaper_base_url),
        };
        log_startup(&self.config, &edition);

        self.prepare_output_dir().await?;

        let mut session = self.launcher.launch().await.map_err(AppError::Launch)?;
        let acquired = self.acquire(&session, edition).await;
        if let Err(e) = session.close().await {
            warn!("⚠️ 关闭浏览器会话失败: {}", e);
        }
        let (edition, result) = acquired?;

        let merged = Assembler::merge(result.artifacts())?;
        let date = edition.date_str();
        let file_name = ArtifactStore::merged_file_name(&date);
        let merged_path = self
            .store
            .save_merged(&date, &merged.bytes)
            .await
            .map_err(|source| AppError::OutputDir {
                path: self.store.dir().display().to_string(),
                source,
            })?;
        info!("💾 合并文件已保存: {}", merged_path.display());

        let outcome = self.distributor.distribute(&merged, &file_name).await;
        if outcome.is_success() {
            let deleted = self.store.clear().await;
            info!("✓ 清理完成，共删除 {} 个文件", deleted);
        } else {
            warn!(
                "⚠️ 发送失败，保留输出目录中的文件: {}",
                self.store.dir().display()
            );
        }

        print_final_stats(
            result.requested(),
            result.acquired(),
            &result.mismatched(),
            &merged.source_pages,
            merged.bytes.len(),
            &outcome,
        );

        Ok(RunSummary {
            requested: result.requested(),
            acquired: result.acquired(),
            mismatched: result.mismatched(),
            merged_pages: merged.page_count,
            merged_from: merged.source_pages,
            merged_path,
            outcome,
        })
    }

    /// 创建输出目录并清掉上次残留的文件
    async fn prepare_output_dir(&self) -> AppResult<()> {
        self.store
            .ensure_dir()
            .await
            .map_err(|source| AppError::OutputDir {
                path: self.store.dir().display().to_string(),
                source,
            })?;
        self.store.clear().await;
        Ok(())
    }

    /// 建立会话并逐版下载
    ///
    /// 会话的关闭由 `run` 负责
    async fn acquire(
        &self,
        session: &L::Session,
        edition: Edition,
    ) -> AppResult<(Edition, RunResult)> {
        self.navigation.establish(session, &edition).await?;

        let total_pages = session.page_count().await.map_err(AppError::PageCount)?;
        let edition = edition.with_total_pages(total_pages);
        info!("📰 {}", edition);

        let sequencer = PageSequencer::new(ExportFetcher::new(&self.store));
        let result = sequencer.run(session, &edition, total_pages).await?;
        Ok((edition, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DistributionFailure, ExportError, ViewerError};
    use crate::testing::{page_tags, FakeLauncher, FakeViewer, NavFailure};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(output: &TempDir, slack: &str) -> Config {
        Config {
            newspaper_base_url: "https://epaper.example.com".to_string(),
            slack_bot_token: "xoxb-test".to_string(),
            slack_channel_id: "C0123".to_string(),
            slack_api_base_url: slack.to_string(),
            output_dir: output.path().join("downloads"),
            edition_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            nav_settle_delay: Duration::ZERO,
            nav_retry_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    async fn mount_slack_success(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/files.getUploadURLExternal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "upload_url": format!("{}/upload/F1", server.uri()),
                "file_id": "F1"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/F1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files.completeUploadExternal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "files": [{ "id": "F1", "title": "2024-05-01_odiya_news.pdf" }]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn files_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn successful_run_distributes_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_slack_success(&server).await;

        let viewer = FakeViewer::with_pages(3).with_pdf_payloads();
        let app = App::with_launcher(
            config(&temp, &server.uri()),
            FakeLauncher::new(viewer.clone()),
        );

        let summary = app.run().await.unwrap();

        assert_eq!(app.launcher.launches(), 1);
        assert_eq!(summary.requested, 3);
        assert_eq!(summary.acquired, 3);
        assert_eq!(summary.merged_pages, 3);
        assert_eq!(summary.merged_from, vec![1, 2, 3]);
        assert!(summary.outcome.is_success());
        assert_eq!(
            viewer.navigated_urls(),
            vec!["https://epaper.example.com/2024-05-01/1".to_string()]
        );
        assert_eq!(viewer.closes(), 1);
        assert!(files_in(&temp.path().join("downloads")).is_empty());
    }

    #[tokio::test]
    async fn mismatched_page_is_left_out_of_the_merge() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_slack_success(&server).await;

        let viewer = FakeViewer::with_pages(5).with_pdf_payloads().mismatch_on(3);
        let app = App::with_launcher(
            config(&temp, &server.uri()),
            FakeLauncher::new(viewer.clone()),
        );

        let summary = app.run().await.unwrap();

        assert_eq!(summary.acquired, 4);
        assert_eq!(summary.mismatched, vec![3]);
        assert_eq!(summary.merged_pages, 4);
        assert_eq!(summary.merged_from, vec![1, 2, 4, 5]);
        assert_eq!(viewer.exports(), vec![1, 2, 4, 5]);
        assert!(summary.outcome.is_success());
    }

    #[tokio::test]
    async fn exhausted_navigation_aborts_before_any_export() {
        let temp = TempDir::new().unwrap();
        let viewer = FakeViewer::with_pages(4).failing_navigation(3, NavFailure::MissingControl);
        let app = App::with_launcher(
            config(&temp, "http://127.0.0.1:9"),
            FakeLauncher::new(viewer.clone()),
        );

        let err = app.run().await.unwrap_err();

        match err {
            AppError::Navigation(e) => assert_eq!(e.attempts, 3),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(app.launcher.launches(), 1);
        assert_eq!(viewer.navigations(), 3);
        assert!(viewer.selections().is_empty());
        assert!(viewer.exports().is_empty());
        assert_eq!(viewer.closes(), 1);
    }

    #[tokio::test]
    async fn navigation_recovers_on_the_last_attempt() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_slack_success(&server).await;

        let viewer = FakeViewer::with_pages(2)
            .with_pdf_payloads()
            .failing_navigation(2, NavFailure::Timeout);
        let app = App::with_launcher(
            config(&temp, &server.uri()),
            FakeLauncher::new(viewer.clone()),
        );

        let summary = app.run().await.unwrap();

        assert_eq!(viewer.navigations(), 3);
        assert_eq!(summary.acquired, 2);
    }

    #[tokio::test]
    async fn unreadable_page_count_releases_the_session_once() {
        let temp = TempDir::new().unwrap();
        let viewer = FakeViewer::with_pages(3).broken_page_count();
        let app = App::with_launcher(
            config(&temp, "http://127.0.0.1:9"),
            FakeLauncher::new(viewer.clone()),
        );

        let err = app.run().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::PageCount(ViewerError::ElementMissing { .. })
        ));
        assert_eq!(viewer.navigations(), 1);
        assert!(viewer.selections().is_empty());
        assert_eq!(viewer.closes(), 1);
        assert_eq!(app.launcher.launches(), 1);
    }

    #[tokio::test]
    async fn export_timeout_aborts_and_releases_the_session_once() {
        let temp = TempDir::new().unwrap();
        let viewer = FakeViewer::with_pages(4).with_pdf_payloads().timeout_on(2);
        let app = App::with_launcher(
            config(&temp, "http://127.0.0.1:9"),
            FakeLauncher::new(viewer.clone()),
        );

        let err = app.run().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Export(ExportError::Timeout { page: 2, .. })
        ));
        assert_eq!(viewer.selections(), vec![1, 2]);
        assert_eq!(viewer.closes(), 1);
        assert!(!temp
            .path()
            .join("downloads")
            .join("2024-05-01_odiya_news.pdf")
            .exists());
    }

    #[tokio::test]
    async fn rejected_upload_keeps_files_for_inspection() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("downloads");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("stale.pdf"), b"old").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files.getUploadURLExternal"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "invalid_auth" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files.completeUploadExternal"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let viewer = FakeViewer::with_pages(2).with_pdf_payloads();
        let app = App::with_launcher(
            config(&temp, &server.uri()),
            FakeLauncher::new(viewer.clone()),
        );

        let summary = app.run().await.unwrap();

        assert!(matches!(
            summary.outcome,
            DistributionOutcome::Failure {
                reason: DistributionFailure::UploadTargetRejected(_)
            }
        ));
        assert_eq!(
            files_in(&output),
            vec![
                "2024-05-01_odiya_news.pdf".to_string(),
                "2024-05-01_page-1.pdf".to_string(),
                "2024-05-01_page-2.pdf".to_string(),
            ]
        );
        let merged = std::fs::read(&summary.merged_path).unwrap();
        assert_eq!(page_tags(&merged), vec![1, 2]);
        assert_eq!(viewer.closes(), 1);
    }
}
