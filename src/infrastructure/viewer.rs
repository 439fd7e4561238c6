//! 翻页阅读器能力
//!
//! 流程层只依赖这里的 trait，不关心页面结构和 CDP 细节

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ViewerError;

/// 一个已打开的阅读器会话
///
/// 阅读器的版号选择框是共享的可变状态，同一时刻只能有一个操作在进行，
/// 所以所有方法都按顺序 await 调用
#[async_trait]
pub trait ViewerSession: Send + Sync {
    /// 导航到指定地址，等待最基本的加载完成
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ViewerError>;

    /// 版号选择框是否已经渲染出来
    async fn control_present(&self) -> Result<bool, ViewerError>;

    /// 总版数（选择框选项个数）
    async fn page_count(&self) -> Result<usize, ViewerError>;

    /// 选中第 `index` 版并等待渲染，返回选择框回读到的值
    async fn select_page(&self, index: usize) -> Result<String, ViewerError>;

    /// 导出当前版，返回下载到的字节
    async fn export_current_page(&self) -> Result<Vec<u8>, ViewerError>;

    /// 释放会话，重复调用是空操作
    async fn close(&mut self) -> Result<(), ViewerError>;
}

/// 打开阅读器会话
#[async_trait]
pub trait ViewerLauncher: Send + Sync {
    type Session: ViewerSession;

    async fn launch(&self) -> Result<Self::Session, ViewerError>;
}
