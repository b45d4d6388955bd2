//! 数据源网关
//!
//! 读取待处理案例，并把处理结果写回数据源的状态列。
//! 写回时按自然键重新定位记录，不依赖内存中的顺序。

pub mod xlsx_gateway;
mod xlsx_patch;

use crate::error::AppResult;
use crate::models::{Case, NaturalKey};
use async_trait::async_trait;

pub use xlsx_gateway::XlsxDataset;

/// 状态列中表示已处理的值
pub const PROCESSED_MARK: &str = "SI";
/// 状态列中表示处理失败的值
pub const FAILED_MARK: &str = "ERROR";

/// 写回结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkResult {
    /// 已写入
    Marked,
    /// 记录已带有该标记，未做修改
    AlreadyMarked,
}

#[async_trait]
pub trait DatasetGateway: Send + Sync {
    /// 状态列不是"已处理"的案例，按数据源中的顺序
    async fn load_unprocessed(&self) -> AppResult<Vec<Case>>;

    /// 运行前已标记为已处理的案例
    async fn already_processed(&self) -> AppResult<Vec<Case>>;

    /// 标记为已处理，找不到记录时返回 `AppError::ExternalWriteFailure`
    async fn mark_processed(&self, key: &NaturalKey) -> AppResult<MarkResult>;

    /// 标记为失败，找不到记录时返回 `AppError::ExternalWriteFailure`
    async fn mark_failed(&self, key: &NaturalKey) -> AppResult<MarkResult>;
}

/// 状态列的值是否表示已处理
pub fn is_processed_mark(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(PROCESSED_MARK)
}
