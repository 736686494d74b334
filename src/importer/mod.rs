// ==========================================
// Sell-out 台账系统 - 导入层
// ==========================================
// 职责: 上传文件 → 表头识别 → 行提取 → 目录解析 → 对账落库
// 支持: Excel (.xlsx/.xlsm/.xls), ODS, CSV
// ==========================================

// 模块声明
pub mod catalog_resolver;
pub mod cell_coercion;
pub mod error;
pub mod file_parser;
pub mod header_resolver;
pub mod incidence_log;
pub mod layout;
pub mod row_extractor;
pub mod sellout_importer_impl;
pub mod sellout_importer_trait;

// 重导出核心类型
pub use catalog_resolver::{BoundedMemo, CatalogResolver, ResolvedCatalog};
pub use cell_coercion::{coerce, Cell, CoercionOrigin, Coerced, Scalar, ScalarKind};
pub use error::{ImportError, ImportResult};
pub use file_parser::{parse_workbook, FileFormat, SheetGrid, Workbook};
pub use header_resolver::{find_header_row, find_store_groups, normalize_header, HeaderMap, StoreGroup};
pub use incidence_log::{render_text_report, report_file_name, IncidenceLog};
pub use layout::{Field, FieldSpec, PartnerLayout, SheetLayout, StoreAxis};
pub use row_extractor::{classify_row, ExtractedRow, RowCandidate, RowOutcome};
pub use sellout_importer_impl::SellOutImporterImpl;

// 重导出 Trait 接口
pub use sellout_importer_trait::SellOutImporter;
