//! 案例与搜索结果行

use std::fmt::Display;

/// 输入数据中的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    /// 外部编号 (NDO)
    pub ndo: String,
    /// 期望的编码 (CODIGO_PAMI)
    pub codigo_pami: String,
    /// 证明文件地址
    pub document_url: Option<String>,
    /// 在数据表中的行号（从 0 开始，含表头）
    pub row: usize,
    /// 姓 (APE)
    pub apellido: Option<String>,
    /// 名 (NOM)
    pub nombre: Option<String>,
}

impl Case {
    pub fn new(ndo: impl Into<String>, codigo_pami: impl Into<String>) -> Self {
        Self {
            ndo: ndo.into(),
            codigo_pami: codigo_pami.into(),
            document_url: None,
            row: 0,
            apellido: None,
            nombre: None,
        }
    }

    pub fn with_document_url(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }

    /// 写回数据源时用来重新定位记录的自然键
    pub fn key(&self) -> NaturalKey {
        NaturalKey {
            ndo: self.ndo.clone(),
            codigo_pami: self.codigo_pami.clone(),
        }
    }

    /// 非空的文件地址
    pub fn document_url(&self) -> Option<&str> {
        self.document_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// 自然键：(NDO, CODIGO_PAMI)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub ndo: String,
    pub codigo_pami: String,
}

impl NaturalKey {
    /// 与数据表中的一行比较，忽略首尾空白
    pub fn matches(&self, ndo: &str, codigo_pami: &str) -> bool {
        self.ndo.trim() == ndo.trim() && self.codigo_pami.trim() == codigo_pami.trim()
    }
}

impl Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NDO {} / COD {}", self.ndo, self.codigo_pami)
    }
}

/// 门户搜索结果表格中的一行
///
/// 只在处理单个案例期间存在。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// 页面驱动给这一行分配的句柄
    pub key: String,
    /// 编码列的原始文字，例如 "456 - RADIOGRAFIA"
    pub code_text: String,
    /// 所有单元格文字
    pub cells: Vec<String>,
}

impl ResultRow {
    /// 该行的选择器
    pub fn selector(&self) -> String {
        format!("[data-rpa-key=\"{}\"]", self.key)
    }

    /// 限定在该行内部的选择器
    pub fn scope(&self, selector: &str) -> String {
        format!("{} {}", self.selector(), selector)
    }
}
