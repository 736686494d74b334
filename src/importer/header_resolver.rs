// ==========================================
// Sell-out 台账系统 - 表头识别
// ==========================================
// 职责: 在工作表顶部定位表头行，构建 字段 → 列索引 映射
// 规则: 仅考虑前 120 列的文本单元格；别名按顺序尝试，同一别名取最左列
// ==========================================

use crate::domain::normalize_store_code;
use crate::importer::cell_coercion::{coerce_text, Cell};
use crate::importer::file_parser::SheetGrid;
use crate::importer::layout::{Field, SheetLayout, StoreAxis};
use std::collections::HashMap;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 表头识别考虑的最大列数
pub const MAX_HEADER_COLUMNS: usize = 120;

/// 标准化表头文本
///
/// # 规则
/// - 小写、去除变音符号（NFD 后丢弃组合字符）
/// - 连续的非 [a-z0-9] 字符折叠为单个 `_`
/// - 去掉首尾 `_`
///
/// `"FECHA_VENTA"` / `"Fecha Venta"` / `"fecha-venta "` → `fecha_venta`
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.nfd().filter(|c| !is_combining_mark(*c)) {
        for lc in c.to_lowercase() {
            if lc.is_ascii_alphanumeric() {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push(lc);
            } else {
                pending_sep = true;
            }
        }
    }

    out
}

// ==========================================
// StoreGroup - 横向门店列组
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreGroup {
    pub code: String, // 已标准化
    pub name: String,
    pub units_col: usize,
    pub value_col: usize, // 紧随单位列
}

// ==========================================
// HeaderMap - 表头映射结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    pub header_row: usize, // 表头所在行索引（0 起始，相对 SheetGrid）
    data_offset: usize,
    columns: HashMap<Field, usize>,
    stores: Vec<StoreGroup>,
}

impl HeaderMap {
    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// 首个数据行索引
    pub fn first_data_row(&self) -> usize {
        self.header_row + 1 + self.data_offset
    }

    /// 横向门店列组（门店为列的布局中为空）
    pub fn stores(&self) -> &[StoreGroup] {
        &self.stores
    }
}

/// 标准化某一行的文本单元格（前 120 列）
fn normalized_row(sheet: &SheetGrid, row_idx: usize) -> Vec<(usize, String)> {
    let Some(row) = sheet.row(row_idx) else {
        return Vec::new();
    };

    row.iter()
        .take(MAX_HEADER_COLUMNS)
        .enumerate()
        .filter_map(|(col, cell)| {
            cell.header_text()
                .map(normalize_header)
                .filter(|t| !t.is_empty())
                .map(|t| (col, t))
        })
        .collect()
}

/// 定位表头行并构建列映射
///
/// # 参数
/// - sheet: 工作表
/// - layout: 工作表布局（字段与别名）
/// - max_depth: 最多扫描的行数
///
/// # 返回
/// - Some(HeaderMap): 首个覆盖全部必填字段的行
/// - None: 扫描深度内未找到
pub fn find_header_row(sheet: &SheetGrid, layout: &SheetLayout, max_depth: usize) -> Option<HeaderMap> {
    let depth = max_depth.min(sheet.height());

    for row_idx in 0..depth {
        let texts = normalized_row(sheet, row_idx);
        if texts.is_empty() {
            continue;
        }

        let covers_required = layout.required_fields().all(|spec| {
            spec.aliases
                .iter()
                .any(|alias| texts.iter().any(|(_, t)| t == alias))
        });
        if !covers_required {
            continue;
        }

        let mut columns = HashMap::new();
        for spec in &layout.fields {
            let hit = spec.aliases.iter().find_map(|alias| {
                texts
                    .iter()
                    .find(|(_, t)| t == alias)
                    .map(|(col, _)| *col)
            });
            if let Some(col) = hit {
                columns.insert(spec.field, col);
            }
        }

        let stores = match &layout.store_axis {
            StoreAxis::Column => Vec::new(),
            StoreAxis::Pivoted { marker } => find_store_groups(sheet, row_idx, marker),
        };

        debug!(
            sheet = %sheet.name(),
            header_row = row_idx,
            mapped = columns.len(),
            stores = stores.len(),
            "表头识别成功"
        );
        return Some(HeaderMap {
            header_row: row_idx,
            data_offset: layout.data_offset,
            columns,
            stores,
        });
    }

    None
}

/// 在表头上方定位横向门店列组
///
/// # 规则
/// - 代码行: 表头之上首个含有 marker 文本单元格的行
/// - 名称行: 代码行的下一行（须仍在表头之上）
/// - 代码单元格含 marker 且名称非空的列构成一组；重复代码只保留最左一组
///
/// # 返回
/// 按列顺序排列的门店列组；找不到代码行时为空
pub fn find_store_groups(sheet: &SheetGrid, header_row: usize, marker: &str) -> Vec<StoreGroup> {
    let marker = normalize_header(marker);
    let has_marker = |cell: &Cell| {
        cell.header_text()
            .is_some_and(|t| normalize_header(t).contains(&marker))
    };

    let code_row = (0..header_row).find(|&idx| {
        sheet
            .row(idx)
            .is_some_and(|cells| cells.iter().take(MAX_HEADER_COLUMNS).any(has_marker))
    });
    let Some(code_row) = code_row else {
        return Vec::new();
    };
    let name_row = code_row + 1;
    if name_row >= header_row {
        return Vec::new();
    }

    let mut groups: Vec<StoreGroup> = Vec::new();
    let width = sheet.row(code_row).map_or(0, |cells| cells.len().min(MAX_HEADER_COLUMNS));
    for col in 0..width {
        let code_cell = sheet.cell(code_row, col);
        if !has_marker(code_cell) {
            continue;
        }
        let Some(name) = coerce_text(sheet.cell(name_row, col)) else {
            continue;
        };
        let code = normalize_store_code(coerce_text(code_cell).as_deref());
        if groups.iter().any(|g| g.code == code) {
            continue;
        }
        groups.push(StoreGroup {
            code,
            name,
            units_col: col,
            value_col: col + 1,
        });
    }

    debug!(sheet = %sheet.name(), code_row, groups = groups.len(), "门店列组识别完成");
    groups
}
