//! # Odiya News
//!
//! 每天从翻页阅读器下载整期报纸，合并成一个 PDF 并发送到 Slack 频道
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器会话），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `ViewerSession` / `ViewerLauncher` - 阅读器能力的 trait 边界
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只做一件事
//! - `ExportFetcher` - 导出单版
//! - `Assembler` - 合并 PDF
//! - `Distributor` - 发送到 Slack
//! - `ArtifactStore` - 输出目录的命名、落盘和清理
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一期报纸"怎么拿下来
//! - `NavigationController` - 打开首版，有限次重试
//! - `PageSequencer` - 按版号顺序逐版导出
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/edition_run` - 一次完整运行，管理会话和清理策略
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod testing;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ChromeLauncher, ViewerLauncher, ViewerSession};
pub use models::{DistributionOutcome, Edition, PageArtifact, PageStatus, RunResult};
pub use orchestrator::{App, RunSummary};
