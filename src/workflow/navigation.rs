//! 会话建立 - 流程层
//!
//! 打开阅读器首版，失败时有限次重试

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{NavigationError, ViewerError};
use crate::infrastructure::ViewerSession;
use crate::models::Edition;

/// 导航最多尝试的次数
pub const MAX_NAVIGATION_ATTEMPTS: usize = 3;

/// 导航重试控制
///
/// 每次尝试：导航（有超时）→ 等待前端异步渲染 → 检查版号选择框。
/// 超时和控件缺失一视同仁，都算一次失败
#[derive(Debug, Clone)]
pub struct NavigationController {
    nav_timeout: Duration,
    settle_delay: Duration,
    retry_delay: Duration,
}

impl NavigationController {
    pub fn new(config: &Config) -> Self {
        Self::with_timings(
            config.nav_timeout,
            config.nav_settle_delay,
            config.nav_retry_delay,
        )
    }

    pub fn with_timings(
        nav_timeout: Duration,
        settle_delay: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            nav_timeout,
            settle_delay,
            retry_delay,
        }
    }

    /// 让会话停在可用的首版上
    ///
    /// 会话的释放由调用方负责，这里无论成败都不关闭它
    pub async fn establish<S>(&self, session: &S, edition: &Edition) -> Result<(), NavigationError>
    where
        S: ViewerSession + ?Sized,
    {
        let url = edition.viewer_url();
        let mut attempt = 1;

        loop {
            info!(
                "🌐 正在打开阅读器 (尝试 {}/{}): {}",
                attempt, MAX_NAVIGATION_ATTEMPTS, url
            );

            match self.attempt(session, &url).await {
                Ok(()) => {
                    info!("✓ 阅读器已就绪");
                    return Ok(());
                }
                Err(e) if attempt < MAX_NAVIGATION_ATTEMPTS => {
                    warn!(
                        "⚠️ 第 {}/{} 次导航失败: {}，{:?} 后重试...",
                        attempt, MAX_NAVIGATION_ATTEMPTS, e, self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "❌ 第 {}/{} 次导航失败: {}",
                        attempt, MAX_NAVIGATION_ATTEMPTS, e
                    );
                    return Err(NavigationError {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn attempt<S>(&self, session: &S, url: &str) -> Result<(), ViewerError>
    where
        S: ViewerSession + ?Sized,
    {
        session.navigate(url, self.nav_timeout).await?;

        // 阅读器在加载完成后才异步渲染控件
        sleep(self.settle_delay).await;

        if !session.control_present().await? {
            return Err(ViewerError::ControlMissing);
        }
        Ok(())
    }
}
