//! 案例处理上下文
//!
//! 封装"我正在处理第几个案例"这一信息

use crate::models::Case;
use std::fmt::Display;

/// 案例处理上下文
#[derive(Debug, Clone)]
pub struct CaseCtx {
    /// 案例在本次运行中的序号（从1开始）
    pub index: usize,

    /// 本次运行的案例总数
    pub total: usize,

    /// 外部编号
    pub ndo: String,

    /// 期望的编码
    pub codigo_pami: String,

    /// 数据表中的行号（从 0 开始）
    pub row: usize,
}

impl CaseCtx {
    /// 创建新的案例上下文
    pub fn new(index: usize, total: usize, case: &Case) -> Self {
        Self {
            index,
            total,
            ndo: case.ndo.clone(),
            codigo_pami: case.codigo_pami.clone(),
            row: case.row,
        }
    }

    /// 电子表格里看到的行号（从 1 开始）
    pub fn sheet_row(&self) -> usize {
        self.row + 1
    }
}

impl Display for CaseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[案例 {}/{} NDO#{} 编码#{}]",
            self.index, self.total, self.ndo, self.codigo_pami
        )
    }
}
