//! # PAMI Auto
//!
//! 在 PAMI 门户上自动处理案例的 Rust 应用程序：
//! 按编号搜索案例、识别按钮状态、上传证明文件并传送。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 页面操作接口，`CdpDriver` 为 chromiumoxide 实现
//! - `Pacing` - 可被停止请求打断的随机等待
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Case
//! - `SearchService` / `case_matcher` - 搜索与编码匹配
//! - `StatusClassifier` - 按钮状态识别
//! - `UploadService` / `TransmitService` - 上传与传送
//! - `PortalLogin` - 登录与打开工作窗口
//! - `ReportWriter` - 写运行报告
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个案例"的完整处理流程
//! - `CaseCtx` - 上下文封装（序号 + NDO）
//! - `CaseFlow` - 状态机（搜索 → 匹配 → 识别 → 上传 → 传送）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 一次运行，管理浏览器会话
//! - `orchestrator/case_processor` - 遍历案例列表，写回数据源
//!
//! ## 外部资源
//! - `dataset/` - Excel 数据源（读取待处理案例、写回状态）
//! - `clients/` - 证明文件下载

pub mod browser;
pub mod clients;
pub mod config;
pub mod dataset;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Case, CaseOutcome, RunReport};
pub use orchestrator::{App, CaseProcessor};
pub use workflow::{CaseCtx, CaseFlow};
