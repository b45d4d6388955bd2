//! Excel 数据源
//!
//! 用 calamine 读取工作簿；写回状态时只改动状态列的那一个单元格，
//! 工作簿的其余内容（公式、格式、其他工作表）保持原样。

use crate::config::ColumnNames;
use crate::dataset::xlsx_patch::{self, CellEdit};
use crate::dataset::{is_processed_mark, DatasetGateway, MarkResult, FAILED_MARK, PROCESSED_MARK};
use crate::error::{AppError, AppResult, DatasetError};
use crate::models::{Case, NaturalKey};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Excel 数据源
pub struct XlsxDataset {
    path: PathBuf,
    sheet_name: Option<String>,
    columns: ColumnNames,
    /// 串行化写入
    write_lock: Mutex<()>,
}

/// 读入内存的一张工作表，行列均为绝对位置
#[derive(Debug, Clone)]
struct SheetGrid {
    name: String,
    cells: Vec<Vec<Data>>,
}

/// 案例表的列位置
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    header_row: usize,
    ndo: usize,
    codigo_pami: usize,
    document_url: Option<usize>,
    /// None 表示状态列还不存在，写入时追加
    processed: Option<usize>,
    apellido: Option<usize>,
    nombre: Option<usize>,
    width: usize,
}

impl XlsxDataset {
    pub fn new(path: impl Into<PathBuf>, sheet_name: Option<String>, columns: ColumnNames) -> Self {
        Self {
            path: path.into(),
            sheet_name,
            columns,
            write_lock: Mutex::new(()),
        }
    }

    /// 读取所有案例及其是否已处理
    async fn load_all(&self) -> AppResult<Vec<(Case, bool)>> {
        let path = self.path.clone();
        let sheet_name = self.sheet_name.clone();
        let columns = self.columns.clone();

        tokio::task::spawn_blocking(move || {
            let sheet = read_sheet(&path, sheet_name.as_deref())?;
            let layout = locate_columns(&sheet, &columns)?;
            Ok(extract_cases(&sheet, &layout))
        })
        .await
        .map_err(|e| AppError::Other(format!("读取任务失败: {}", e)))?
    }

    async fn mark(&self, key: &NaturalKey, mark: &'static str) -> AppResult<MarkResult> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let sheet_name = self.sheet_name.clone();
        let columns = self.columns.clone();
        let key = key.clone();

        let result = tokio::task::spawn_blocking(move || {
            write_mark(&path, sheet_name.as_deref(), &columns, &key, mark)
        })
        .await
        .map_err(|e| AppError::Other(format!("写入任务失败: {}", e)))??;

        Ok(result)
    }
}

#[async_trait]
impl DatasetGateway for XlsxDataset {
    async fn load_unprocessed(&self) -> AppResult<Vec<Case>> {
        let cases: Vec<Case> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|(_, processed)| !processed)
            .map(|(case, _)| case)
            .collect();
        info!("✓ 读取到 {} 个待处理案例", cases.len());
        Ok(cases)
    }

    async fn already_processed(&self) -> AppResult<Vec<Case>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|(_, processed)| *processed)
            .map(|(case, _)| case)
            .collect())
    }

    async fn mark_processed(&self, key: &NaturalKey) -> AppResult<MarkResult> {
        self.mark(key, PROCESSED_MARK).await
    }

    async fn mark_failed(&self, key: &NaturalKey) -> AppResult<MarkResult> {
        self.mark(key, FAILED_MARK).await
    }
}

// ========== 读取 ==========

/// 读取案例所在的工作表（未指定名称时取第一张）
fn read_sheet(path: &Path, sheet_name: Option<&str>) -> AppResult<SheetGrid> {
    if !path.exists() {
        return Err(DatasetError::NotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(DatasetError::SheetNotFound("(空工作簿)".to_string()).into());
    }

    let name = match sheet_name {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| DatasetError::SheetNotFound(wanted.to_string()))?,
        None => names[0].clone(),
    };

    let range = workbook.worksheet_range(&name)?;
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut cells: Vec<Vec<Data>> = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut full = vec![Data::Empty; start_col];
        full.extend(row.iter().cloned());
        cells.push(full);
    }

    Ok(SheetGrid { name, cells })
}

/// 单元格文字，整数值的浮点数去掉小数部分
fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::Float(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn optional_text(row: &[Data], col: Option<usize>) -> Option<String> {
    col.map(|c| cell_text(row.get(c))).filter(|s| !s.is_empty())
}

fn locate_columns(sheet: &SheetGrid, columns: &ColumnNames) -> AppResult<ColumnLayout> {
    let header_row = sheet
        .cells
        .iter()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| DatasetError::MissingColumn {
            column: columns.ndo.clone(),
        })?;
    let header: Vec<String> = sheet.cells[header_row]
        .iter()
        .map(|c| cell_text(Some(c)).to_uppercase())
        .collect();

    let find = |name: &str| header.iter().position(|h| h == &name.trim().to_uppercase());
    let required = |name: &str| {
        find(name).ok_or_else(|| DatasetError::MissingColumn {
            column: name.to_string(),
        })
    };

    Ok(ColumnLayout {
        header_row,
        ndo: required(&columns.ndo)?,
        codigo_pami: required(&columns.codigo_pami)?,
        document_url: find(&columns.document_url),
        processed: find(&columns.processed),
        apellido: find(&columns.apellido),
        nombre: find(&columns.nombre),
        width: header.len(),
    })
}

fn extract_cases(sheet: &SheetGrid, layout: &ColumnLayout) -> Vec<(Case, bool)> {
    sheet
        .cells
        .iter()
        .enumerate()
        .skip(layout.header_row + 1)
        .filter_map(|(row_index, row)| {
            let ndo = cell_text(row.get(layout.ndo));
            if ndo.is_empty() {
                return None;
            }
            let processed = layout
                .processed
                .map(|c| is_processed_mark(&cell_text(row.get(c))))
                .unwrap_or(false);
            let case = Case {
                ndo,
                codigo_pami: cell_text(row.get(layout.codigo_pami)),
                document_url: optional_text(row, layout.document_url),
                row: row_index,
                apellido: optional_text(row, layout.apellido),
                nombre: optional_text(row, layout.nombre),
            };
            Some((case, processed))
        })
        .collect()
}

// ========== 写回 ==========

fn write_mark(
    path: &Path,
    sheet_name: Option<&str>,
    columns: &ColumnNames,
    key: &NaturalKey,
    mark: &str,
) -> AppResult<MarkResult> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false);
    if !is_xlsx {
        return Err(DatasetError::WriteFailed(format!("只能写回 xlsx 文件: {}", path.display())).into());
    }

    // 每次写回都重新读取文件，容忍外部的并发修改
    let sheet = read_sheet(path, sheet_name)?;
    let layout = locate_columns(&sheet, columns)?;

    let row_index = sheet
        .cells
        .iter()
        .enumerate()
        .skip(layout.header_row + 1)
        .find(|(_, row)| {
            key.matches(
                &cell_text(row.get(layout.ndo)),
                &cell_text(row.get(layout.codigo_pami)),
            )
        })
        .map(|(i, _)| i)
        .ok_or_else(|| AppError::ExternalWriteFailure(format!("数据源中找不到记录 {}", key)))?;

    let mut edits = Vec::with_capacity(2);
    let status_col = match layout.processed {
        Some(col) => col,
        None => {
            debug!("状态列 {} 不存在，追加到第 {} 列", columns.processed, layout.width);
            edits.push(CellEdit::new(layout.header_row, layout.width, columns.processed.as_str()));
            layout.width
        }
    };

    let current = cell_text(sheet.cells[row_index].get(status_col));
    if current.eq_ignore_ascii_case(mark) || is_processed_mark(&current) {
        warn!("⚠️ 记录 {} 已标记为 {}，跳过写入", key, current);
        return Ok(MarkResult::AlreadyMarked);
    }

    edits.push(CellEdit::new(row_index, status_col, mark));
    xlsx_patch::write_cells(path, &sheet.name, &edits)?;

    debug!("记录 {} 已标记为 {}", key, mark);
    Ok(MarkResult::Marked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Xlsx};
    use rust_xlsxwriter::{Format, Workbook};

    fn write_input(path: &Path, rows: &[[&str; 4]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Casos").unwrap();
        for (c, h) in ["NDO", "CODIGO_PAMI", "URL_DOCUMENTO", "PROCESADO"].iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            // NDO 写成数字，模拟 Excel 的常见情况
            sheet
                .write_number(r as u32 + 1, 0, row[0].parse::<f64>().unwrap())
                .unwrap();
            for (c, value) in row.iter().enumerate().skip(1) {
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save(path).unwrap();
    }

    #[tokio::test]
    async fn loads_unprocessed_and_marks_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");
        write_input(
            &path,
            &[
                ["123", "456", "https://docs.example.com/123.pdf", ""],
                ["124", "789", "", "SI"],
                ["125", "111", "", "ERROR"],
            ],
        );

        let dataset = XlsxDataset::new(&path, None, ColumnNames::default());

        let pending = dataset.load_unprocessed().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].ndo, "123");
        assert_eq!(pending[0].codigo_pami, "456");
        assert_eq!(
            pending[0].document_url.as_deref(),
            Some("https://docs.example.com/123.pdf")
        );
        assert_eq!(pending[1].ndo, "125");

        let done = dataset.already_processed().await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].ndo, "124");

        let key = pending[0].key();
        assert_eq!(dataset.mark_processed(&key).await.unwrap(), MarkResult::Marked);
        assert_eq!(
            dataset.mark_processed(&key).await.unwrap(),
            MarkResult::AlreadyMarked
        );

        let pending = dataset.load_unprocessed().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].ndo, "125");
    }

    #[tokio::test]
    async fn marking_keeps_formulas_and_other_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Casos").unwrap();
        sheet.write_string_with_format(0, 0, "NDO", &bold).unwrap();
        sheet.write_string(0, 1, "CODIGO_PAMI").unwrap();
        sheet.write_string(0, 2, "TOTAL").unwrap();
        sheet.write_number(1, 0, 123.0).unwrap();
        sheet.write_string(1, 1, "456").unwrap();
        sheet.write_formula(1, 2, "=A2*2").unwrap();
        let notes = workbook.add_worksheet();
        notes.set_name("Notas").unwrap();
        notes.write_string(0, 0, "no tocar").unwrap();
        workbook.save(&path).unwrap();

        let dataset = XlsxDataset::new(&path, Some("Casos".into()), ColumnNames::default());
        let case = dataset.load_unprocessed().await.unwrap().remove(0);
        assert_eq!(dataset.mark_processed(&case.key()).await.unwrap(), MarkResult::Marked);

        let mut book: Xlsx<_> = open_workbook(&path).unwrap();
        let formulas = book.worksheet_formula("Casos").unwrap();
        assert_eq!(formulas.get_value((1, 2)).map(String::as_str), Some("A2*2"));

        let values = book.worksheet_range("Casos").unwrap();
        assert_eq!(values.get_value((0, 3)), Some(&Data::String("PROCESADO".into())));
        assert_eq!(values.get_value((1, 3)), Some(&Data::String("SI".into())));

        let notes = book.worksheet_range("Notas").unwrap();
        assert_eq!(notes.get_value((0, 0)), Some(&Data::String("no tocar".into())));

        assert!(dataset.load_unprocessed().await.unwrap().is_empty());
        assert!(!dir.path().join("input.xlsx.tmp").exists());
    }

    #[tokio::test]
    async fn missing_row_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");
        write_input(&path, &[["123", "456", "", ""]]);

        let dataset = XlsxDataset::new(&path, Some("Casos".into()), ColumnNames::default());
        let missing = NaturalKey {
            ndo: "999".into(),
            codigo_pami: "456".into(),
        };
        let err = dataset.mark_failed(&missing).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalWriteFailure(_)));
    }

    #[tokio::test]
    async fn unknown_sheet_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");
        write_input(&path, &[["123", "456", "", ""]]);

        let dataset = XlsxDataset::new(&path, Some("Otra".into()), ColumnNames::default());
        let err = dataset.load_unprocessed().await.unwrap_err();
        assert!(matches!(err, AppError::Dataset(DatasetError::SheetNotFound(_))));
    }
}
