//! 案例处理结果

use crate::models::case::Case;
use std::path::PathBuf;

/// 结果说明，写入报告的 ESTADO 列
pub mod reason {
    pub const NO_TABLE_DATA: &str = "no table data";
    pub const CODE_NOT_FOUND: &str = "code not found";
    pub const MANUAL_VALIDATION_PENDING: &str = "manual validation pending";
    pub const ALREADY_COMPLETED: &str = "already completed";
    pub const VALIDATION_INDICATOR_ERROR: &str = "validation indicator error";
    pub const UPLOAD_INDICATOR_AMBIGUOUS: &str = "upload indicator ambiguous";
    pub const MISSING_DOCUMENT_URL: &str = "missing document url";
    pub const DOCUMENT_DOWNLOAD_FAILED: &str = "document download failed";
    pub const UPLOAD_FAILED: &str = "upload failed";
    pub const TRANSMIT_FAILED: &str = "transmit failed";
    pub const TRANSMITTED: &str = "transmitted";
    pub const PROCESSING_ERROR: &str = "processing error";
}

/// 单个案例的最终结果，每个案例只产生一次
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub case: Case,
    /// 给人看的状态说明
    pub status: String,
    pub kind: OutcomeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeKind {
    Processed {
        /// 搜索结果表格中的行数
        matched_rows: Option<usize>,
    },
    Failed {
        screenshot: Option<PathBuf>,
        error: Option<String>,
    },
}

impl CaseOutcome {
    pub fn processed(case: &Case, status: impl Into<String>, matched_rows: Option<usize>) -> Self {
        Self {
            case: case.clone(),
            status: status.into(),
            kind: OutcomeKind::Processed { matched_rows },
        }
    }

    pub fn failed(case: &Case, status: impl Into<String>) -> Self {
        Self {
            case: case.clone(),
            status: status.into(),
            kind: OutcomeKind::Failed {
                screenshot: None,
                error: None,
            },
        }
    }

    pub fn with_screenshot(mut self, path: Option<PathBuf>) -> Self {
        if let OutcomeKind::Failed { screenshot, .. } = &mut self.kind {
            *screenshot = path;
        }
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        if let OutcomeKind::Failed { error, .. } = &mut self.kind {
            *error = Some(message.into());
        }
        self
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Processed { .. })
    }

    pub fn screenshot(&self) -> Option<&PathBuf> {
        match &self.kind {
            OutcomeKind::Failed { screenshot, .. } => screenshot.as_ref(),
            OutcomeKind::Processed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::Failed { error, .. } => error.as_deref(),
            OutcomeKind::Processed { .. } => None,
        }
    }
}

/// 一次运行的汇总
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub processed: Vec<CaseOutcome>,
    pub failed: Vec<CaseOutcome>,
    /// 运行前已标记为处理完成的案例，原样透传
    pub already_processed: Vec<Case>,
    /// 是否因停止请求提前结束
    pub stopped: bool,
}

impl RunReport {
    pub fn record(&mut self, outcome: CaseOutcome) {
        if outcome.is_processed() {
            self.processed.push(outcome);
        } else {
            self.failed.push(outcome);
        }
    }

    /// 本次运行处理过的案例数
    pub fn attempted(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}
