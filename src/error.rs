use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// 远程阅读器上的等待阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    /// 页面导航
    Navigation,
    /// 版面渲染完成标记
    PageReady,
    /// 导出按钮出现
    ExportControl,
    /// 下载事件完成
    Download,
}

impl fmt::Display for WaitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitStage::Navigation => "页面导航",
            WaitStage::PageReady => "版面渲染",
            WaitStage::ExportControl => "导出按钮",
            WaitStage::Download => "下载完成",
        };
        f.write_str(name)
    }
}

/// 远程阅读器（浏览器会话）错误
#[derive(Debug, Error)]
pub enum ViewerError {
    /// 有界等待超时
    #[error("等待{stage}超时 ({after:?})")]
    Timeout { stage: WaitStage, after: Duration },

    /// 页面中找不到必需的控件
    #[error("页面缺少控件: {selector}")]
    ElementMissing { selector: String },

    /// 导航完成但阅读器控件没有渲染出来
    #[error("阅读器控件未渲染")]
    ControlMissing,

    /// 阅读器报告下载被取消
    #[error("下载被取消: {guid}")]
    DownloadCanceled { guid: String },

    /// 会话已关闭
    #[error("浏览器会话已关闭")]
    Closed,

    /// CDP 协议错误
    #[error("浏览器协议错误: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// 启动或配置浏览器失败
    #[error("浏览器配置失败: {0}")]
    Setup(String),

    /// 脚本返回值无法解析
    #[error("脚本返回值无效: {0}")]
    Json(#[from] serde_json::Error),

    /// 本地文件读写失败
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 会话在重试上限内始终不可用
#[derive(Debug, Error)]
#[error("导航失败，已尝试 {attempts} 次: {source}")]
pub struct NavigationError {
    pub attempts: usize,
    #[source]
    pub source: ViewerError,
}

/// 单版导出错误（超时在这里是致命的，会终止整次运行）
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("第 {page} 版{stage}超时")]
    Timeout { page: usize, stage: WaitStage },

    #[error("第 {page} 版导出失败: {source}")]
    Viewer {
        page: usize,
        #[source]
        source: ViewerError,
    },

    #[error("第 {page} 版保存失败: {source}")]
    Io {
        page: usize,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// 把阅读器错误归类为导出错误，超时单独成类
    pub fn from_viewer(page: usize, err: ViewerError) -> Self {
        match err {
            ViewerError::Timeout { stage, .. } => ExportError::Timeout { page, stage },
            other => ExportError::Viewer {
                page,
                source: other,
            },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExportError::Timeout { .. })
    }
}

/// 合并 PDF 失败
#[derive(Debug, Error)]
pub enum MergeError {
    /// 某一版的内容不是可解析的 PDF
    #[error("第 {page} 版 PDF 无法解析: {source}")]
    Unreadable {
        page: usize,
        #[source]
        source: lopdf::Error,
    },

    /// 某一版的页面树结构损坏
    #[error("第 {page} 版 PDF 结构损坏: {detail}")]
    Malformed { page: usize, detail: String },

    /// 序列化合并结果失败
    #[error("合并结果序列化失败: {0}")]
    Serialize(String),
}

/// 消息渠道上传失败的原因
#[derive(Debug, Error)]
pub enum DistributionFailure {
    #[error("获取上传地址失败: {0}")]
    UploadTargetRejected(String),

    #[error("响应缺少字段: {0}")]
    MissingField(&'static str),

    #[error("上传文件失败 (HTTP {0})")]
    TransferRejected(u16),

    #[error("完成上传失败: {0}")]
    CompleteRejected(String),

    #[error("请求失败: {0}")]
    Http(#[from] reqwest::Error),
}

/// 清理文件失败（只记录日志，不向上传播）
#[derive(Debug, Error)]
#[error("清理失败 ({path}): {source}")]
pub struct CleanupError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必需的配置项不存在
    #[error("缺少必需的配置项 {var_name}")]
    Missing { var_name: &'static str },

    /// 配置值无法解析
    #[error("配置项 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    Invalid {
        var_name: &'static str,
        value: String,
        expected_type: &'static str,
    },

    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无效: {reason}")]
    File { path: String, reason: String },
}

/// 应用程序错误类型（一次运行中所有致命错误）
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("启动浏览器失败: {0}")]
    Launch(#[source] ViewerError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("读取总版数失败: {0}")]
    PageCount(#[source] ViewerError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("输出目录不可用 ({path}): {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
