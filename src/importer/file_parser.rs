// ==========================================
// Sell-out 台账系统 - 文件解析器实现
// ==========================================
// 职责: 上传字节流 → 内存工作簿（按工作表保存原始单元格）
// 支持: Excel (.xlsx/.xlsm/.xls) / ODS (.ods) / CSV (.csv)
// ==========================================

use crate::importer::cell_coercion::Cell;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{Data, Ods, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

// ==========================================
// FileFormat - 支持的文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Xlsx,
    Xls,
    Ods,
    Csv,
}

impl FileFormat {
    /// 根据文件扩展名判断格式
    pub fn from_file_name(file_name: &str) -> ImportResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xlsx" | "xlsm" => Ok(FileFormat::Xlsx),
            "xls" => Ok(FileFormat::Xls),
            "ods" => Ok(FileFormat::Ods),
            "csv" => Ok(FileFormat::Csv),
            _ => Err(ImportError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

// ==========================================
// SheetGrid - 单个工作表
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    name: String,
    rows: Vec<Vec<Cell>>,
    first_row: usize, // 数据区在原表中的起始行（0 起始）
}

static EMPTY_CELL: Cell = Cell::Empty;

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self::with_offset(name, rows, 0)
    }

    pub fn with_offset(name: impl Into<String>, rows: Vec<Vec<Cell>>, first_row: usize) -> Self {
        Self {
            name: name.into(),
            rows,
            first_row,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    /// 读取单元格（越界返回空单元格）
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// 行索引 → 原表行号（1 起始）
    pub fn row_number(&self, idx: usize) -> i64 {
        (self.first_row + idx + 1) as i64
    }
}

// ==========================================
// Workbook - 内存工作簿
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<SheetGrid>,
}

impl Workbook {
    pub fn new(sheets: Vec<SheetGrid>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[SheetGrid] {
        &self.sheets
    }

    /// 按名称查找工作表（忽略大小写与首尾空白）
    pub fn sheet_by_name(&self, name: &str) -> Option<&SheetGrid> {
        let wanted = name.trim();
        self.sheets
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn first_sheet(&self) -> Option<&SheetGrid> {
        self.sheets.first()
    }
}

// ==========================================
// 通用文件解析入口
// ==========================================

/// 解析上传文件
///
/// # 参数
/// - bytes: 文件内容
/// - file_name: 原始文件名（用于判断格式）
///
/// # 返回
/// - Ok(Workbook): 全部工作表
/// - Err: 空文件 / 格式不支持 / 文件损坏
pub fn parse_workbook(bytes: &[u8], file_name: &str) -> ImportResult<Workbook> {
    if bytes.is_empty() {
        return Err(ImportError::EmptyFile(file_name.to_string()));
    }

    let format = FileFormat::from_file_name(file_name)?;
    debug!(file_name = %file_name, format = ?format, size = bytes.len(), "开始解析文件");

    let cursor = Cursor::new(bytes.to_vec());
    match format {
        FileFormat::Xlsx => {
            let wb: Xlsx<_> = Xlsx::new(cursor)
                .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
            load_sheets(wb)
        }
        FileFormat::Xls => {
            let wb: Xls<_> =
                Xls::new(cursor).map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
            load_sheets(wb)
        }
        FileFormat::Ods => {
            let wb: Ods<_> =
                Ods::new(cursor).map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
            load_sheets(wb)
        }
        FileFormat::Csv => parse_csv(bytes, file_name),
    }
}

/// 读取 calamine 工作簿的全部工作表
fn load_sheets<RS, R>(mut workbook: R) -> ImportResult<Workbook>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(ImportError::ExcelParseError("工作簿无工作表".to_string()));
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ImportError::ExcelParseError(format!("{}: {}", name, e)))?;

        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(to_cell).collect())
            .collect();

        debug!(sheet = %name, rows = rows.len(), first_row = first_row, "工作表读取完成");
        sheets.push(SheetGrid::with_offset(name, rows, first_row));
    }

    Ok(Workbook::new(sheets))
}

/// calamine 单元格 → Cell
fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Date(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

/// 解析 CSV（单工作表；分隔符在 `,` 与 `;` 间自动选择）
fn parse_csv(bytes: &[u8], file_name: &str) -> ImportResult<Workbook> {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    let delimiter = if semicolons > commas { b';' } else { b',' };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // 允许行长度不一致
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Vec<Cell> = record
            .iter()
            .map(|value| {
                let v = value.trim_start_matches('\u{feff}');
                if v.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    let name = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("CSV")
        .to_string();

    Ok(Workbook::new(vec![SheetGrid::new(name, rows)]))
}
