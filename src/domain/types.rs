// ==========================================
// Sell-out 台账系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 数据类别 (Data Kind)
// ==========================================
// 一个上传文件最多包含两类工作表: 销售 / 库存
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataKind {
    Sales, // 销售（VENTAS）
    Stock, // 库存（STOCK）
}

impl DataKind {
    /// 工作表标签（同时用于事件记录的 hoja 字段）
    pub fn sheet_label(&self) -> &'static str {
        match self {
            DataKind::Sales => "VENTAS",
            DataKind::Stock => "STOCK",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sheet_label())
    }
}

// ==========================================
// 对账结果 (Record Outcome)
// ==========================================
// 由对账引擎独占决定：按复合业务键命中则更新，否则插入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordOutcome {
    Inserted,
    Updated,
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOutcome::Inserted => write!(f, "INSERTED"),
            RecordOutcome::Updated => write!(f, "UPDATED"),
        }
    }
}
