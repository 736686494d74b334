// ==========================================
// Sell-out 台账系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务键规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod client;
pub mod ingestion;
pub mod sales;
pub mod types;

// 重导出核心类型
pub use catalog::{CatalogMatch, CatalogMiss, PriceCacheEntry};
pub use client::{Client, DEFAULT_CLIENT_CODE, DEPRATI_CLIENT_CODE};
pub use ingestion::{Incidence, IngestionResult, RunDetail, SheetStats};
pub use sales::{
    normalize_store_code, BulkDeleteOutcome, LedgerFilter, LedgerKey, LedgerListItem,
    SalesRecord, SalesRecordUpdate, NO_STORE_SENTINEL,
};
pub use types::{DataKind, RecordOutcome};
