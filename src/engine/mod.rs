// ==========================================
// Sell-out 台账系统 - 引擎层
// ==========================================
// 职责: 台账对账规则（插入/更新判定、分批落库）
// 红线: 引擎不拼 SQL，SQL 原语由仓储层提供
// ==========================================

pub mod reconciliation;

// 重导出核心引擎
pub use reconciliation::{FlushOutcome, PendingWrite, ReconciliationEngine, RowFailure};
