// ==========================================
// Sell-out 台账系统 - 数据行提取与分类
// ==========================================
// 职责: 按列映射提取 (日期, 门店, 条码, 度量, 城市) 并分类
// 分类顺序（预扫描与主处理共用）:
//   1. 空行 → 跳过，不计入读取
//   2. 其余行计入读取
//   3. 汇总行 (Resultado) → 静默跳过
//   4. 无正度量 → 静默跳过
//   5. 日期缺失 → 事件
//   6. 条码缺失 → 事件 + 未匹配集合
//   7. 候选行 → 进入目录解析
// 横向门店布局中一行展开为多个候选（每个度量为正的门店一个）
// ==========================================

use crate::domain::ingestion::{EMPTY_CODE, INVALID_DATE_CODE};
use crate::domain::Incidence;
use crate::importer::cell_coercion::{coerce, coerce_date, Cell, ScalarKind};
use crate::importer::file_parser::SheetGrid;
use crate::importer::header_resolver::HeaderMap;
use crate::importer::layout::Field;
use chrono::NaiveDate;

/// 汇总行标记（条码列）
pub const SUMMARY_MARKER: &str = "Resultado";
pub const MISSING_DATE_REASON: &str = "fecha vacía o no reconocida";
pub const MISSING_CODE_REASON: &str = "REF_Proveedor vacío.";

// ==========================================
// RowCandidate - 通过分类的数据行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RowCandidate {
    pub row_number: i64,
    pub date: NaiveDate,
    pub store: Option<String>, // 未标准化；进入业务键时再处理
    pub store_name: Option<String>,
    pub code: String, // 已 TRIM
    pub units: f64,
    pub value: f64,
    pub city: Option<String>,
    pub brand: Option<String>,        // 文件自带的品牌（目录缺失时补位）
    pub product_name: Option<String>, // 文件自带的产品名称
}

// ==========================================
// RowOutcome - 行分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Absent,
    SummaryMarker,
    NoMeasure,
    MissingDate { code: Option<String> },
    MissingCode,
    Candidates(Vec<RowCandidate>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub row_number: i64, // 原表行号（1 起始）
    pub outcome: RowOutcome,
    pub fallbacks: usize, // 度量兜底转换次数
}

impl ExtractedRow {
    /// 是否计入“读取行数”
    pub fn counts_as_read(&self) -> bool {
        !matches!(self.outcome, RowOutcome::Absent)
    }

    /// 行级事件（仅日期缺失 / 条码缺失两类）
    pub fn incidence(&self, sheet: &str) -> Option<Incidence> {
        match &self.outcome {
            RowOutcome::MissingDate { code } => {
                let code = code.clone().unwrap_or_else(|| INVALID_DATE_CODE.to_string());
                Some(Incidence::new(code, MISSING_DATE_REASON, self.row_number, sheet))
            }
            RowOutcome::MissingCode => Some(Incidence::new(
                EMPTY_CODE,
                MISSING_CODE_REASON,
                self.row_number,
                sheet,
            )),
            _ => None,
        }
    }

    pub fn candidates(&self) -> &[RowCandidate] {
        match &self.outcome {
            RowOutcome::Candidates(c) => c,
            _ => &[],
        }
    }
}

/// 一个门店的度量槽位
struct MeasureSlot {
    store: Option<String>,
    store_name: Option<String>,
    units: f64,
    value: f64,
}

fn row_is_blank(sheet: &SheetGrid, row_idx: usize) -> bool {
    match sheet.row(row_idx) {
        None => true,
        Some(cells) => cells.iter().all(Cell::is_blank),
    }
}

/// 单行的单元格读取器（按字段类型转换，累计度量兜底次数）
struct RowReader<'a> {
    sheet: &'a SheetGrid,
    header: &'a HeaderMap,
    row_idx: usize,
    fallbacks: usize,
}

impl<'a> RowReader<'a> {
    fn mapped_cell(&self, field: Field) -> Option<&'a Cell> {
        self.header
            .column(field)
            .map(|col| self.sheet.cell(self.row_idx, col))
    }

    fn text(&self, field: Field) -> Option<String> {
        let kind = field.scalar_kind().unwrap_or(ScalarKind::Text);
        self.mapped_cell(field)
            .and_then(|cell| coerce(cell, kind).value.into_text())
    }

    /// 度量单元格 → 小数（列缺失视为 0）
    fn measure_at(&mut self, cell: Option<&Cell>) -> f64 {
        match cell {
            Some(cell) => {
                let c = coerce(cell, ScalarKind::Decimal);
                if c.is_fallback() {
                    self.fallbacks += 1;
                }
                c.value.as_decimal()
            }
            None => 0.0,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        self.mapped_cell(Field::Date).and_then(coerce_date)
    }

    /// 全部门店槽位的度量（未筛选正值）
    fn slots(&mut self) -> Vec<MeasureSlot> {
        if self.header.stores().is_empty() {
            let units_cell = self.mapped_cell(Field::Units);
            let value_cell = self.mapped_cell(Field::Value);
            let units = self.measure_at(units_cell);
            let value = self.measure_at(value_cell);
            return vec![MeasureSlot {
                store: self.text(Field::Store),
                store_name: None,
                units,
                value,
            }];
        }

        let (sheet, header, row_idx) = (self.sheet, self.header, self.row_idx);
        header
            .stores()
            .iter()
            .map(|group| {
                let units = self.measure_at(Some(sheet.cell(row_idx, group.units_col)));
                let value = self.measure_at(Some(sheet.cell(row_idx, group.value_col)));
                MeasureSlot {
                    store: Some(group.code.clone()),
                    store_name: Some(group.name.clone()),
                    units,
                    value,
                }
            })
            .collect()
    }
}

/// 分类单个数据行
///
/// # 参数
/// - sheet: 工作表
/// - header: 表头映射
/// - row_idx: 行索引（相对 SheetGrid）
pub fn classify_row(sheet: &SheetGrid, header: &HeaderMap, row_idx: usize) -> ExtractedRow {
    let row_number = sheet.row_number(row_idx);

    if row_is_blank(sheet, row_idx) {
        return ExtractedRow {
            row_number,
            outcome: RowOutcome::Absent,
            fallbacks: 0,
        };
    }

    let mut reader = RowReader {
        sheet,
        header,
        row_idx,
        fallbacks: 0,
    };

    let code = reader.text(Field::Code);
    if code
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(SUMMARY_MARKER))
    {
        return ExtractedRow {
            row_number,
            outcome: RowOutcome::SummaryMarker,
            fallbacks: 0,
        };
    }

    let positive: Vec<MeasureSlot> = reader
        .slots()
        .into_iter()
        .filter(|slot| slot.units > 0.0 || slot.value > 0.0)
        .collect();

    let outcome = if positive.is_empty() {
        RowOutcome::NoMeasure
    } else {
        match reader.date() {
            None => RowOutcome::MissingDate { code },
            Some(date) => match code {
                None => RowOutcome::MissingCode,
                Some(code) => {
                    let city = reader.text(Field::City);
                    let brand = reader.text(Field::Brand);
                    let product_name = reader.text(Field::ProductName);
                    RowOutcome::Candidates(
                        positive
                            .into_iter()
                            .map(|slot| RowCandidate {
                                row_number,
                                date,
                                store: slot.store,
                                store_name: slot.store_name,
                                code: code.clone(),
                                units: slot.units,
                                value: slot.value,
                                city: city.clone(),
                                brand: brand.clone(),
                                product_name: product_name.clone(),
                            })
                            .collect(),
                    )
                }
            },
        }
    };

    ExtractedRow {
        row_number,
        outcome,
        fallbacks: reader.fallbacks,
    }
}

/// 逐行分类表头以下的全部数据行
pub fn extract_rows<'a>(sheet: &'a SheetGrid, header: &'a HeaderMap) -> impl Iterator<Item = ExtractedRow> + 'a {
    (header.first_data_row()..sheet.height()).map(move |idx| classify_row(sheet, header, idx))
}
