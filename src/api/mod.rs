// ==========================================
// Sell-out 台账系统 - API 层
// ==========================================
// 职责: 提供上传导入与台账维护接口，供 CLI / 外部服务调用
// ==========================================

pub mod error;
pub mod ingest_api;
pub mod ledger_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use ingest_api::{IngestApi, IngestResponse};
pub use ledger_api::LedgerApi;
