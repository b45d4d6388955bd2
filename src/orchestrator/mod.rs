//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 运行处理器
//! - 管理应用生命周期（初始化、运行、清理）
//! - 管理浏览器会话（BrowserSession）
//! - 写出运行报告并输出统计
//!
//! ### `case_processor` - 案例处理器
//! - 按顺序遍历案例（Vec<Case>）
//! - 创建并复用 CaseFlow
//! - 写回数据源、响应停止请求
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (一次运行)
//!     ↓
//! case_processor (处理 Vec<Case>)
//!     ↓
//! workflow::CaseFlow (处理单个 Case)
//!     ↓
//! services (能力层：search / classify / upload / transmit)
//!     ↓
//! infrastructure (基础设施：PageDriver / JsExecutor)
//! ```

pub mod batch_processor;
pub mod case_processor;

pub use batch_processor::App;
pub use case_processor::CaseProcessor;
