//! xlsx 单元格原地改写
//!
//! 只改动目标工作表 XML 里的指定单元格，压缩包中的其他条目原样拷贝。
//! 公式、样式、其他工作表因此保持不变。

use crate::error::{AppError, AppResult, DatasetError};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// 一次单元格写入，行列从 0 开始
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub row: usize,
    pub col: usize,
    pub text: String,
}

impl CellEdit {
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
        }
    }
}

/// 行号（从 1 开始）到 列号 -> 文字
type PendingCells = BTreeMap<u32, BTreeMap<u32, String>>;

/// 把若干单元格写入工作簿中名为 `sheet_name` 的工作表
///
/// 先写到同目录的临时文件，成功后再替换原文件。
pub fn write_cells(path: &Path, sheet_name: &str, edits: &[CellEdit]) -> AppResult<()> {
    let bytes = std::fs::read(path)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let sheet_part = sheet_part_name(&mut archive, sheet_name)?;
    let sheet_xml = read_entry(&mut archive, &sheet_part)?;
    let patched = patch_sheet_xml(&sheet_xml, edits)?;

    let tmp_path = path.with_extension("xlsx.tmp");
    if let Err(e) = write_archive(&mut archive, &tmp_path, &sheet_part, &patched) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    tmp_path: &Path,
    sheet_part: &str,
    patched: &[u8],
) -> AppResult<()> {
    let mut writer = ZipWriter::new(File::create(tmp_path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.name() == sheet_part {
            writer.start_file(sheet_part, options)?;
            writer.write_all(patched)?;
        } else {
            writer.raw_copy_file(entry)?;
        }
    }

    writer.finish()?;
    Ok(())
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> AppResult<String> {
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// 通过 workbook.xml 和它的关系文件找到工作表对应的 XML 条目
fn sheet_part_name<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_name: &str,
) -> AppResult<String> {
    let workbook = read_entry(archive, "xl/workbook.xml")?;
    let rel_id = element_attributes(&workbook, b"sheet")?
        .into_iter()
        .find(|attrs| attrs.get("name").map(String::as_str) == Some(sheet_name))
        .and_then(|mut attrs| attrs.remove("id"))
        .ok_or_else(|| DatasetError::SheetNotFound(sheet_name.to_string()))?;

    let rels = read_entry(archive, "xl/_rels/workbook.xml.rels")?;
    let target = element_attributes(&rels, b"Relationship")?
        .into_iter()
        .find(|attrs| attrs.get("Id") == Some(&rel_id))
        .and_then(|mut attrs| attrs.remove("Target"))
        .ok_or_else(|| DatasetError::WriteFailed(format!("工作表 {} 缺少关系 {}", sheet_name, rel_id)))?;

    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    })
}

/// 收集指定元素的属性，键为去掉前缀的属性名
fn element_attributes(xml: &str, element: &[u8]) -> AppResult<Vec<HashMap<String, String>>> {
    let mut reader = Reader::from_str(xml);
    let mut found = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == element => {
                let mut attrs = HashMap::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    let value = attr.unescape_value().map_err(xml_error)?.into_owned();
                    attrs.insert(key, value);
                }
                found.push(attrs);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found)
}

// ========== 工作表 XML ==========

/// 在 sheetData 中替换或插入单元格，其余内容逐事件原样写出
fn patch_sheet_xml(xml: &str, edits: &[CellEdit]) -> AppResult<Vec<u8>> {
    let mut pending: PendingCells = BTreeMap::new();
    for edit in edits {
        pending
            .entry(edit.row as u32 + 1)
            .or_default()
            .insert(edit.col as u32, edit.text.clone());
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut prefix = String::new();
    let mut in_sheet_data = false;
    let mut last_row = 0u32;
    let mut last_col: Option<u32> = None;
    // 当前行中尚未写出的单元格
    let mut row_cells: Option<(u32, BTreeMap<u32, String>)> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(&e);
                in_sheet_data = true;
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(&e);
                writer.write_event(Event::Start(e.borrow())).map_err(xml_error)?;
                flush_rows_before(&mut writer, &prefix, &mut pending, u32::MAX)?;
                writer.write_event(Event::End(e.to_end())).map_err(xml_error)?;
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                flush_rows_before(&mut writer, &prefix, &mut pending, u32::MAX)?;
                in_sheet_data = false;
                writer.write_event(Event::End(e)).map_err(xml_error)?;
            }
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let number = row_number(&e)?.unwrap_or(last_row + 1);
                last_row = number;
                last_col = None;
                flush_rows_before(&mut writer, &prefix, &mut pending, number)?;
                match pending.remove(&number) {
                    Some(cells) => {
                        writer
                            .write_event(Event::Start(without_spans(&e)?))
                            .map_err(xml_error)?;
                        row_cells = Some((number, cells));
                    }
                    None => writer.write_event(Event::Start(e)).map_err(xml_error)?,
                }
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let number = row_number(&e)?.unwrap_or(last_row + 1);
                last_row = number;
                flush_rows_before(&mut writer, &prefix, &mut pending, number)?;
                match pending.remove(&number) {
                    Some(cells) => {
                        let start = without_spans(&e)?;
                        let end = start.to_end().into_owned();
                        writer.write_event(Event::Start(start)).map_err(xml_error)?;
                        for (col, text) in &cells {
                            write_cell(&mut writer, &prefix, number, *col, text, None)?;
                        }
                        writer.write_event(Event::End(end)).map_err(xml_error)?;
                    }
                    None => writer.write_event(Event::Empty(e)).map_err(xml_error)?,
                }
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                if let Some((number, cells)) = row_cells.take() {
                    for (col, text) in &cells {
                        write_cell(&mut writer, &prefix, number, *col, text, None)?;
                    }
                }
                writer.write_event(Event::End(e)).map_err(xml_error)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" && row_cells.is_some() => {
                let replaced = match row_cells.as_mut() {
                    Some(row) => patch_cell(&mut writer, &prefix, &e, row, &mut last_col)?,
                    None => false,
                };
                if replaced {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                } else {
                    writer.write_event(Event::Start(e)).map_err(xml_error)?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" && row_cells.is_some() => {
                let replaced = match row_cells.as_mut() {
                    Some(row) => patch_cell(&mut writer, &prefix, &e, row, &mut last_col)?,
                    None => false,
                };
                if !replaced {
                    writer.write_event(Event::Empty(e)).map_err(xml_error)?;
                }
            }
            Event::Eof => break,
            event => writer.write_event(event).map_err(xml_error)?,
        }
    }

    if !pending.is_empty() {
        return Err(DatasetError::WriteFailed("工作表中没有 sheetData".to_string()).into());
    }

    Ok(writer.into_inner())
}

/// 写出列号小于当前单元格的新单元格；如果当前单元格就是目标，写出替换并返回 true
fn patch_cell<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    cell: &BytesStart,
    row: &mut (u32, BTreeMap<u32, String>),
    last_col: &mut Option<u32>,
) -> AppResult<bool> {
    let (number, cells) = row;
    let col = match attribute(cell, "r")? {
        Some(reference) => column_index(&reference)
            .ok_or_else(|| DatasetError::WriteFailed(format!("无法识别的单元格地址 {}", reference)))?,
        None => last_col.map_or(0, |c| c + 1),
    };
    *last_col = Some(col);

    while let Some(entry) = cells.first_entry() {
        if *entry.key() >= col {
            break;
        }
        let (before, text) = entry.remove_entry();
        write_cell(writer, prefix, *number, before, &text, None)?;
    }

    match cells.remove(&col) {
        Some(text) => {
            let style = attribute(cell, "s")?;
            write_cell(writer, prefix, *number, col, &text, style.as_deref())?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn flush_rows_before<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    pending: &mut PendingCells,
    before: u32,
) -> AppResult<()> {
    while let Some(entry) = pending.first_entry() {
        if *entry.key() >= before {
            break;
        }
        let (number, cells) = entry.remove_entry();
        let row_name = format!("{}row", prefix);
        let number_text = number.to_string();
        let mut start = BytesStart::new(row_name.as_str());
        start.push_attribute(("r", number_text.as_str()));
        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        for (col, text) in &cells {
            write_cell(writer, prefix, number, *col, text, None)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(row_name.as_str())))
            .map_err(xml_error)?;
    }
    Ok(())
}

/// 以内联字符串写出一个单元格
fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    row: u32,
    col: u32,
    text: &str,
    style: Option<&str>,
) -> AppResult<()> {
    let cell_name = format!("{}c", prefix);
    let is_name = format!("{}is", prefix);
    let t_name = format!("{}t", prefix);
    let reference = cell_reference(row, col);

    let mut start = BytesStart::new(cell_name.as_str());
    start.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }
    start.push_attribute(("t", "inlineStr"));

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new(is_name.as_str())))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new(t_name.as_str())))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(t_name.as_str())))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(is_name.as_str())))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(cell_name.as_str())))
        .map_err(xml_error)?;
    Ok(())
}

/// 行内容变化后 spans 不再准确，去掉它
fn without_spans(row: &BytesStart) -> AppResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(row.name().as_ref()).into_owned();
    let mut copy = BytesStart::new(name);
    for attr in row.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() != b"spans" {
            copy.push_attribute(attr);
        }
    }
    Ok(copy)
}

fn element_prefix(element: &BytesStart) -> String {
    match element.name().prefix() {
        Some(prefix) => format!("{}:", String::from_utf8_lossy(prefix.as_ref())),
        None => String::new(),
    }
}

fn attribute(element: &BytesStart, key: &str) -> AppResult<Option<String>> {
    Ok(element
        .try_get_attribute(key)
        .map_err(xml_error)?
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned()))
}

fn row_number(row: &BytesStart) -> AppResult<Option<u32>> {
    match attribute(row, "r")? {
        Some(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DatasetError::WriteFailed(format!("无法识别的行号 {}", text)).into()),
        None => Ok(None),
    }
}

// ========== 单元格地址 ==========

/// 0 -> "A"，26 -> "AA"
fn column_name(mut col: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// "AB12" -> 27
fn column_index(reference: &str) -> Option<u32> {
    let letters: Vec<char> = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let value = letters.iter().fold(0u32, |acc, c| {
        acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
    });
    Some(value - 1)
}

fn cell_reference(row: u32, col: u32) -> String {
    format!("{}{}", column_name(col), row)
}

fn xml_error(err: impl Display) -> AppError {
    AppError::Dataset(DatasetError::WriteFailed(format!("工作表 XML 处理失败: {}", err)))
}
