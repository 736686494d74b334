// ==========================================
// Sell-out 台账系统 - 客户实体
// ==========================================

use serde::{Deserialize, Serialize};

/// 未指定客户编码时的默认客户
pub const DEFAULT_CLIENT_CODE: &str = "MZCL-000008";

/// Deprati 文件固定归属的客户
pub const DEPRATI_CLIENT_CODE: &str = "MZCL-000009";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub code: String, // 业务编码（如 MZCL-000008）
    pub name: Option<String>,
}
