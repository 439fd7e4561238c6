//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次完整运行的调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! edition_run::App (一期报纸：会话、合并、发送、清理)
//!     ↓
//! workflow (NavigationController / PageSequencer)
//!     ↓
//! services (能力层：export / assemble / distribute / store)
//!     ↓
//! infrastructure (基础设施：ViewerSession / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有阅读器会话
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计

pub mod edition_run;

pub use edition_run::{App, RunSummary};
