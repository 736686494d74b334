// ==========================================
// Sell-out 台账系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 零售 sell-out 报表导入，合并为 门店 × 日 × 产品 的销售/库存台账
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 对账规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DataKind, RecordOutcome};

// 领域实体
pub use domain::{
    BulkDeleteOutcome, Client, Incidence, IngestionResult, LedgerFilter, LedgerKey,
    LedgerListItem, SalesRecord, SalesRecordUpdate,
};

// 引擎
pub use engine::ReconciliationEngine;

// 导入
pub use importer::{SellOutImporter, SellOutImporterImpl};

// API
pub use api::{ApiError, IngestApi, IngestResponse, LedgerApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Sell-out 台账系统";
