//! 案例匹配
//!
//! 把数据中的期望编码与搜索结果中每一行编码列的首个片段逐一比较。

use crate::infrastructure::NodeSnapshot;
use crate::models::{Case, ResultRow};

/// 编码列文字的首个片段
///
/// "456 - RADIOGRAFIA" → "456"；没有 " - " 时取第一个空白分隔的词。
pub fn leading_code(code_text: &str) -> &str {
    let text = code_text.trim();
    match text.split_once(" - ") {
        Some((head, _)) => head.trim(),
        None => text.split_whitespace().next().unwrap_or(""),
    }
}

/// 按表格顺序（从上到下）找到第一个编码完全相同的行
pub fn find_match<'a>(case: &Case, rows: &'a [ResultRow]) -> Option<&'a ResultRow> {
    let expected = case.codigo_pami.trim();
    if expected.is_empty() {
        return None;
    }
    rows.iter().find(|row| leading_code(&row.code_text) == expected)
}

/// 把表格节点转换为结果行
///
/// 单元格数量不足的行（例如 "没有数据" 占位行）会被丢弃。
pub fn extract_rows(nodes: Vec<NodeSnapshot>, code_column: usize) -> Vec<ResultRow> {
    nodes
        .into_iter()
        .filter(|node| node.cells.len() > code_column)
        .map(|node| ResultRow {
            code_text: node.cells[code_column].clone(),
            key: node.key,
            cells: node.cells,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, code_text: &str) -> ResultRow {
        ResultRow {
            key: key.to_string(),
            code_text: code_text.to_string(),
            cells: vec!["01/09/2026".to_string(), code_text.to_string()],
        }
    }

    #[test]
    fn leading_code_prefers_dash_separator() {
        assert_eq!(leading_code("456 - X-RAY"), "456");
        assert_eq!(leading_code("  456 - RX TORAX - FRENTE "), "456");
        assert_eq!(leading_code("456 RX"), "456");
        assert_eq!(leading_code("456-X"), "456-X");
        assert_eq!(leading_code(""), "");
    }

    #[test]
    fn first_exact_match_wins() {
        let case = Case::new("123", "456");
        let rows = vec![
            row("k1", "4567 - ECOGRAFIA"),
            row("k2", "456 - X-RAY"),
            row("k3", "456 - X-RAY"),
        ];
        assert_eq!(find_match(&case, &rows).map(|r| r.key.as_str()), Some("k2"));
    }

    #[test]
    fn no_match_returns_none() {
        let case = Case::new("124", "789");
        let rows = vec![row("k1", "456 - X-RAY"), row("k2", "7890 - LAB")];
        assert!(find_match(&case, &rows).is_none());
        assert!(find_match(&Case::new("1", " "), &rows).is_none());
    }

    #[test]
    fn placeholder_rows_are_dropped() {
        let nodes = vec![
            NodeSnapshot {
                key: "k1".into(),
                text: "No hay datos".into(),
                value: None,
                cells: vec!["No hay datos".into()],
            },
            NodeSnapshot {
                key: "k2".into(),
                text: "01/09/2026 456 - X-RAY".into(),
                value: None,
                cells: vec!["01/09/2026".into(), "456 - X-RAY".into()],
            },
        ];
        let rows = extract_rows(nodes, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "k2");
        assert_eq!(rows[0].code_text, "456 - X-RAY");
    }
}
