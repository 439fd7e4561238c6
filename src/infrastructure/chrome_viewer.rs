//! 基于 chromiumoxide 的阅读器会话

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, SetDownloadBehaviorBehavior,
    SetDownloadBehaviorParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::{ViewerError, WaitStage};
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::viewer::{ViewerLauncher, ViewerSession};

/// 版号选择框
const PAGE_SELECT: &str = "#tpgnumber";
/// 翻页容器，出现即表示当前版已渲染
const PAGE_READY: &str = ".flipbook-viewport";
/// 单版 PDF 下载按钮
const EXPORT_TRIGGER: &str = r#"span.teIcoImg[onclick*="currentissues"]"#;
/// 轮询元素的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 会话内各类等待的上限
#[derive(Debug, Clone, Copy)]
pub struct ViewerTimeouts {
    pub page_ready: Duration,
    pub export_control: Duration,
    pub download: Duration,
}

impl ViewerTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_ready: config.page_ready_timeout,
            export_control: config.export_control_timeout,
            download: config.download_timeout,
        }
    }
}

/// 启动（或连接）浏览器并打开阅读器会话
pub struct ChromeLauncher {
    debug_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    download_dir: PathBuf,
    timeouts: ViewerTimeouts,
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            debug_port: config.browser_debug_port,
            chrome_executable: config.chrome_executable.clone(),
            download_dir: config.output_dir.join(".incoming"),
            timeouts: ViewerTimeouts::from_config(config),
        }
    }
}

#[async_trait]
impl ViewerLauncher for ChromeLauncher {
    type Session = ChromeViewer;

    async fn launch(&self) -> Result<ChromeViewer, ViewerError> {
        let (browser, page, attached) = match self.debug_port {
            Some(port) => {
                let (browser, page) = browser::connect_to_browser(port).await?;
                (browser, page, true)
            }
            None => {
                let (browser, page) =
                    browser::launch_headless_browser(self.chrome_executable.as_deref()).await?;
                (browser, page, false)
            }
        };

        let mut viewer = ChromeViewer {
            browser: Some(browser),
            executor: Some(JsExecutor::new(page)),
            attached,
            download_dir: self.download_dir.clone(),
            timeouts: self.timeouts,
        };

        // 启用下载失败时也要释放浏览器
        if let Err(e) = viewer.enable_downloads().await {
            if let Err(close_err) = viewer.close().await {
                warn!("关闭浏览器失败: {}", close_err);
            }
            return Err(e);
        }

        Ok(viewer)
    }
}

/// 阅读器会话
///
/// 职责：
/// - 持有 Browser 和唯一的 JsExecutor
/// - 把选择框、change 事件、下载事件这些页面细节藏在 `ViewerSession` 后面
pub struct ChromeViewer {
    browser: Option<Browser>,
    executor: Option<JsExecutor>,
    /// 连接的是外部浏览器时只关闭页面，不关闭浏览器
    attached: bool,
    download_dir: PathBuf,
    timeouts: ViewerTimeouts,
}

impl ChromeViewer {
    fn executor(&self) -> Result<&JsExecutor, ViewerError> {
        self.executor.as_ref().ok_or(ViewerError::Closed)
    }

    /// 让浏览器把下载文件按 guid 存进临时目录，并上报下载事件
    async fn enable_downloads(&self) -> Result<(), ViewerError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let download_dir = tokio::fs::canonicalize(&self.download_dir).await?;

        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(download_dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(ViewerError::Setup)?;

        self.executor()?.page().execute(params).await?;
        debug!("下载目录: {}", download_dir.display());
        Ok(())
    }

    /// 轮询直到元素出现
    async fn wait_for(
        &self,
        selector: &str,
        stage: WaitStage,
        limit: Duration,
    ) -> Result<Element, ViewerError> {
        let executor = self.executor()?;
        timeout(limit, async {
            loop {
                if let Some(element) = executor.query(selector).await {
                    return element;
                }
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| ViewerError::Timeout {
            stage,
            after: limit,
        })
    }
}

#[async_trait]
impl ViewerSession for ChromeViewer {
    async fn navigate(&self, url: &str, limit: Duration) -> Result<(), ViewerError> {
        let page = self.executor()?.page();
        match timeout(limit, page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(ViewerError::Timeout {
                stage: WaitStage::Navigation,
                after: limit,
            }),
        }
    }

    async fn control_present(&self) -> Result<bool, ViewerError> {
        Ok(self.executor()?.query(PAGE_SELECT).await.is_some())
    }

    async fn page_count(&self) -> Result<usize, ViewerError> {
        let js_code = format!(
            "(() => {{ const select = document.querySelector({}); return select ? select.options.length : null; }})()",
            serde_json::to_string(PAGE_SELECT)?
        );
        self.executor()?
            .eval_as::<Option<usize>>(js_code)
            .await?
            .ok_or_else(|| ViewerError::ElementMissing {
                selector: PAGE_SELECT.to_string(),
            })
    }

    async fn select_page(&self, index: usize) -> Result<String, ViewerError> {
        let executor = self.executor()?;
        let selector = serde_json::to_string(PAGE_SELECT)?;

        // 阅读器靠 change 事件翻页，只改 value 不会重新渲染
        let js_code = format!(
            r#"
            (() => {{
                const select = document.querySelector({});
                if (!select) return false;
                select.value = {};
                select.dispatchEvent(new Event("change"));
                return true;
            }})()
            "#,
            selector,
            serde_json::to_string(&index.to_string())?
        );
        if !executor.eval_as::<bool>(js_code).await? {
            return Err(ViewerError::ElementMissing {
                selector: PAGE_SELECT.to_string(),
            });
        }

        self.wait_for(PAGE_READY, WaitStage::PageReady, self.timeouts.page_ready)
            .await?;

        let readback = format!(
            "(() => {{ const select = document.querySelector({}); return select ? String(select.value) : null; }})()",
            selector
        );
        executor
            .eval_as::<Option<String>>(readback)
            .await?
            .ok_or_else(|| ViewerError::ElementMissing {
                selector: PAGE_SELECT.to_string(),
            })
    }

    async fn export_current_page(&self) -> Result<Vec<u8>, ViewerError> {
        let executor = self.executor()?;
        let trigger = self
            .wait_for(
                EXPORT_TRIGGER,
                WaitStage::ExportControl,
                self.timeouts.export_control,
            )
            .await?;

        // 先订阅再点击，避免漏掉下载事件
        let mut progress = executor
            .page()
            .event_listener::<EventDownloadProgress>()
            .await?;
        trigger.click().await?;

        let limit = self.timeouts.download;
        let guid = timeout(limit, async {
            while let Some(event) = progress.next().await {
                match event.state {
                    DownloadProgressState::Completed => return Ok(event.guid.clone()),
                    DownloadProgressState::Canceled => {
                        return Err(ViewerError::DownloadCanceled {
                            guid: event.guid.clone(),
                        })
                    }
                    _ => {}
                }
            }
            Err(ViewerError::Closed)
        })
        .await
        .map_err(|_| ViewerError::Timeout {
            stage: WaitStage::Download,
            after: limit,
        })??;

        let path = self.download_dir.join(&guid);
        let bytes = tokio::fs::read(&path).await?;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!("删除临时下载文件失败 {}: {}", path.display(), e);
        }
        debug!("下载完成: {} ({} 字节)", guid, bytes.len());
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<(), ViewerError> {
        let executor = self.executor.take();
        let browser = self.browser.take();
        if executor.is_none() && browser.is_none() {
            return Ok(());
        }

        if let Some(executor) = executor {
            if let Err(e) = executor.into_page().close().await {
                warn!("关闭页面失败: {}", e);
            }
        }

        if let Some(mut browser) = browser {
            if !self.attached {
                browser.close().await?;
                browser.wait().await?;
            }
        }

        info!("🔒 浏览器会话已关闭");
        Ok(())
    }
}
