// ==========================================
// Sell-out 台账系统 - 导入运行结果模型
// ==========================================
// 职责: 事件记录 (Incidence) / 工作表统计 / 运行汇总
// 序列化: 对外契约字段名（codigo/motivo/fila/hoja 等）
// ==========================================

use crate::domain::types::DataKind;
use serde::{Deserialize, Serialize};

/// 工作表级 / 致命级事件编码
pub const GENERAL_CODE: &str = "GENERAL";
/// 致命事件所属的工作表标签
pub const GENERAL_SHEET: &str = "GENERAL";
/// 条码为空的事件编码（同时记入未匹配编码集合）
pub const EMPTY_CODE: &str = "CODBARRA_VACIO";
/// 日期缺失且条码也为空时的事件编码
pub const INVALID_DATE_CODE: &str = "FECHA_INVALIDA";
/// 单行处理异常的事件编码
pub const ROW_ERROR_CODE: &str = "ERROR_FILA";
/// 工作表级事件的行号
pub const NO_ROW: i64 = -1;

// ==========================================
// Incidence - 事件记录
// ==========================================
// 创建后不可变；只出现在运行汇总与文本报告中，不落库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incidence {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "fila")]
    pub row: i64, // 1 起始；工作表级为 -1
    #[serde(rename = "hoja")]
    pub sheet: String,
}

impl Incidence {
    pub fn new(
        code: impl Into<String>,
        reason: impl Into<String>,
        row: i64,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
            row,
            sheet: sheet.into(),
        }
    }

    /// 工作表级结构错误（如找不到表头）
    pub fn general(reason: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self::new(GENERAL_CODE, reason, NO_ROW, sheet)
    }

    /// 致命错误（终止本次运行）
    pub fn fatal(detail: impl std::fmt::Display) -> Self {
        Self::general(format!("ERROR FATAL: {}", detail), GENERAL_SHEET)
    }

    pub fn is_general(&self) -> bool {
        self.code == GENERAL_CODE
    }
}

// ==========================================
// SheetStats - 单个工作表的统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetStats {
    #[serde(rename = "filasLeidas")]
    pub rows_read: usize,
    #[serde(rename = "filasProcesadas")]
    pub rows_processed: usize,
    #[serde(rename = "insertados")]
    pub inserted: usize,
    #[serde(rename = "actualizados")]
    pub updated: usize,
    #[serde(rename = "conversionesPorDefecto")]
    pub coercion_fallbacks: usize,
}

// ==========================================
// RunDetail - 运行明细（诊断用）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDetail {
    #[serde(rename = "idEjecucion")]
    pub run_id: String,
    #[serde(rename = "ventas")]
    pub sales: SheetStats,
    #[serde(rename = "stock")]
    pub stock: SheetStats,
}

impl RunDetail {
    pub fn stats(&self, kind: DataKind) -> &SheetStats {
        match kind {
            DataKind::Sales => &self.sales,
            DataKind::Stock => &self.stock,
        }
    }

    pub fn stats_mut(&mut self, kind: DataKind) -> &mut SheetStats {
        match kind {
            DataKind::Sales => &mut self.sales,
            DataKind::Stock => &mut self.stock,
        }
    }
}

// ==========================================
// IngestionResult - 单次导入运行汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub ok: bool,
    #[serde(rename = "formato")]
    pub partner: String, // 文件布局（RM / DEPRATI）
    #[serde(rename = "archivo")]
    pub file_name: String,
    #[serde(rename = "codCliente")]
    pub client_code: String,
    #[serde(rename = "filasLeidasVentas")]
    pub sales_rows_read: usize,
    #[serde(rename = "filasProcesadasVentas")]
    pub sales_rows_processed: usize,
    #[serde(rename = "filasLeidasStock")]
    pub stock_rows_read: usize,
    #[serde(rename = "filasProcesadasStock")]
    pub stock_rows_processed: usize,
    #[serde(rename = "codigosNoEncontrados")]
    pub unmatched_codes: Vec<String>,
    #[serde(rename = "incidencias")]
    pub incidences: Vec<Incidence>,
    #[serde(rename = "tiempoSegundos")]
    pub elapsed_seconds: f64,
    #[serde(rename = "detalle")]
    pub detail: RunDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incidence_contract_field_names() {
        let inc = Incidence::new("CB9", "No existe en tabla PRODUCTO (codBarraSap).", 4, "VENTAS");
        let json = serde_json::to_value(&inc).unwrap();
        assert_eq!(json["codigo"], "CB9");
        assert_eq!(json["fila"], 4);
        assert_eq!(json["hoja"], "VENTAS");
        assert!(json["motivo"].as_str().unwrap().contains("PRODUCTO"));
    }

    #[test]
    fn test_fatal_incidence_is_general() {
        let inc = Incidence::fatal("archivo corrupto");
        assert!(inc.is_general());
        assert_eq!(inc.row, NO_ROW);
        assert_eq!(inc.sheet, GENERAL_SHEET);
        assert_eq!(inc.reason, "ERROR FATAL: archivo corrupto");
    }
}
