//! 运行报告写入服务 - 业务能力层
//!
//! 只负责把 `RunReport` 写成 Excel 文件，不关心流程

use crate::error::AppResult;
use crate::models::{Case, CaseOutcome, RunReport};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::debug;

const OUTCOME_HEADERS: [&str; 7] = ["NDO", "CODIGO_PAMI", "APE", "NOM", "ESTADO", "ERROR", "CAPTURA"];
const CASE_HEADERS: [&str; 4] = ["NDO", "CODIGO_PAMI", "APE", "NOM"];

/// 报告写入服务
///
/// 每次运行生成 `automation_log_<时间戳>.xlsx`，包含三个工作表：
/// 处理成功、处理失败、运行前已处理。
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 写入报告，返回文件路径
    pub fn write(&self, report: &RunReport) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("automation_log_{}.xlsx", timestamp));
        write_report(&path, report)?;
        debug!("报告已写入: {}", path.display());
        Ok(path)
    }
}

/// 把报告写到指定路径
pub fn write_report(path: &Path, report: &RunReport) -> AppResult<()> {
    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Procesados")?;
    write_outcomes(sheet, &header, &report.processed)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Fallidos")?;
    write_outcomes(sheet, &header, &report.failed)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Ya procesados")?;
    write_headers(sheet, &header, &CASE_HEADERS)?;
    for (i, case) in report.already_processed.iter().enumerate() {
        write_case(sheet, (i + 1) as u32, case)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_headers(sheet: &mut Worksheet, format: &Format, headers: &[&str]) -> AppResult<()> {
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, format)?;
    }
    Ok(())
}

fn write_case(sheet: &mut Worksheet, row: u32, case: &Case) -> AppResult<()> {
    sheet.write_string(row, 0, &case.ndo)?;
    sheet.write_string(row, 1, &case.codigo_pami)?;
    sheet.write_string(row, 2, case.apellido.as_deref().unwrap_or(""))?;
    sheet.write_string(row, 3, case.nombre.as_deref().unwrap_or(""))?;
    Ok(())
}

fn write_outcomes(sheet: &mut Worksheet, format: &Format, outcomes: &[CaseOutcome]) -> AppResult<()> {
    write_headers(sheet, format, &OUTCOME_HEADERS)?;
    for (i, outcome) in outcomes.iter().enumerate() {
        let row = (i + 1) as u32;
        write_case(sheet, row, &outcome.case)?;
        sheet.write_string(row, 4, &outcome.status)?;
        sheet.write_string(row, 5, outcome.error().unwrap_or(""))?;
        let screenshot = outcome
            .screenshot()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        sheet.write_string(row, 6, &screenshot)?;
    }
    Ok(())
}
