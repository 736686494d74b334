// ==========================================
// Sell-out 台账系统 - 事件日志
// ==========================================
// 职责: 累积行级 / 工作表级事件与未匹配条码，生成运行汇总与文本报告
// 红线: 只追加，不修改已有事件
// ==========================================

use crate::domain::ingestion::{Incidence, IngestionResult, RunDetail, GENERAL_CODE};
use crate::domain::DataKind;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

/// 文本报告下载文件名前缀（后接伙伴标识）
pub const REPORT_FILE_PREFIX: &str = "incidencias_";

// ==========================================
// IncidenceLog - 单次运行的事件汇集
// ==========================================
#[derive(Debug, Default)]
pub struct IncidenceLog {
    incidences: Vec<Incidence>,
    unmatched: BTreeSet<String>,
}

impl IncidenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录行级事件
    pub fn add(&mut self, code: impl Into<String>, reason: impl Into<String>, row: i64, sheet: impl Into<String>) {
        self.incidences.push(Incidence::new(code, reason, row, sheet));
    }

    /// 记录工作表级 / 致命事件
    pub fn add_general(&mut self, reason: impl Into<String>, sheet: impl Into<String>) {
        self.incidences.push(Incidence::general(reason, sheet));
    }

    pub fn push(&mut self, incidence: Incidence) {
        self.incidences.push(incidence);
    }

    /// 记录未匹配条码（去重）
    pub fn mark_unmatched(&mut self, code: impl Into<String>) {
        self.unmatched.insert(code.into());
    }

    pub fn has_general(&self) -> bool {
        self.incidences.iter().any(|i| i.code == GENERAL_CODE)
    }

    pub fn incidences(&self) -> &[Incidence] {
        &self.incidences
    }

    pub fn unmatched(&self) -> &BTreeSet<String> {
        &self.unmatched
    }

    /// 生成运行汇总
    ///
    /// # 规则
    /// - ok = 不存在 GENERAL 事件（行级事件不影响）
    /// - 未匹配条码排序去重
    pub fn summarize(
        self,
        partner: &str,
        file_name: &str,
        client_code: &str,
        detail: RunDetail,
        elapsed_seconds: f64,
    ) -> IngestionResult {
        let ok = !self.has_general();
        let sales = *detail.stats(DataKind::Sales);
        let stock = *detail.stats(DataKind::Stock);

        IngestionResult {
            ok,
            partner: partner.to_string(),
            file_name: file_name.to_string(),
            client_code: client_code.to_string(),
            sales_rows_read: sales.rows_read,
            sales_rows_processed: sales.rows_processed,
            stock_rows_read: stock.rows_read,
            stock_rows_processed: stock.rows_processed,
            unmatched_codes: self.unmatched.into_iter().collect(),
            incidences: self.incidences,
            elapsed_seconds,
            detail,
        }
    }
}

/// 文本报告文件名（incidencias_<伙伴>_yyyyMMdd_HHmmss.txt）
pub fn report_file_name(partner: &str, now: NaiveDateTime) -> String {
    format!("{}{}_{}.txt", REPORT_FILE_PREFIX, partner, now.format("%Y%m%d_%H%M%S"))
}

/// 渲染纯文本事件报告
pub fn render_text_report(result: &IngestionResult, now: NaiveDateTime) -> String {
    let mut lines = vec![
        format!("INCIDENCIAS DE CARGA {}", result.partner),
        format!("Archivo: {}", result.file_name),
        format!("Fecha/Hora: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!("Ventas - Filas leídas: {}", result.sales_rows_read),
        format!("Ventas - Filas procesadas: {}", result.sales_rows_processed),
        format!("Stock  - Filas leídas: {}", result.stock_rows_read),
        format!("Stock  - Filas procesadas: {}", result.stock_rows_processed),
        format!("Tiempo (s): {}", result.elapsed_seconds),
        String::new(),
        "CODIGOS_NO_ENCONTRADOS".to_string(),
    ];

    if result.unmatched_codes.is_empty() {
        lines.push("Sin códigos no encontrados.".to_string());
    } else {
        lines.extend(result.unmatched_codes.iter().cloned());
    }
    lines.push(String::new());

    lines.push("DETALLE_INCIDENCIAS".to_string());
    lines.push("HOJA\tFILA\tCODIGO\tMOTIVO".to_string());
    if result.incidences.is_empty() {
        lines.push("Sin incidencias.".to_string());
    } else {
        lines.extend(
            result
                .incidences
                .iter()
                .map(|inc| format!("{}\t{}\t{}\t{}", inc.sheet, inc.row, inc.code, inc.reason)),
        );
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ingestion::{SheetStats, EMPTY_CODE};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap()
    }

    #[test]
    fn test_row_incidences_keep_ok() {
        let mut log = IncidenceLog::new();
        log.add("CB9", "No existe en SAP_Prod_cache (cod_barra).", 4, "VENTAS");
        log.add("CB9", "No existe en SAP_Prod_cache (cod_barra).", 7, "VENTAS");
        log.mark_unmatched("CB9");
        log.mark_unmatched("CB9");
        log.mark_unmatched(EMPTY_CODE);

        let result = log.summarize("RM", "rm.xlsx", "MZCL-000008", RunDetail::default(), 0.5);
        assert!(result.ok);
        assert_eq!(result.incidences.len(), 2);
        assert_eq!(result.unmatched_codes, vec!["CB9".to_string(), EMPTY_CODE.to_string()]);
    }

    #[test]
    fn test_general_incidence_flips_ok() {
        let mut log = IncidenceLog::new();
        log.add_general("No se encontró encabezado de STOCK.", "STOCK");
        assert!(log.has_general());

        let mut detail = RunDetail::default();
        detail.sales = SheetStats {
            rows_read: 3,
            rows_processed: 1,
            ..Default::default()
        };
        let result = log.summarize("RM", "rm.xlsx", "MZCL-000008", detail, 1.25);
        assert!(!result.ok);
        assert_eq!(result.sales_rows_read, 3);
        assert_eq!(result.sales_rows_processed, 1);
        assert_eq!(result.stock_rows_read, 0);
    }

    #[test]
    fn test_text_report_layout() {
        let mut log = IncidenceLog::new();
        log.add("CB9", "No existe en tabla PRODUCTO (codBarraSap).", 4, "VENTAS");
        log.mark_unmatched("CB9");
        let mut detail = RunDetail::default();
        detail.sales.rows_read = 3;
        detail.sales.rows_processed = 1;
        let result = log.summarize("RM", "rm.xlsx", "MZCL-000008", detail, 0.25);

        let text = render_text_report(&result, at());
        let expected = "INCIDENCIAS DE CARGA RM\n\
Archivo: rm.xlsx\n\
Fecha/Hora: 2024-03-05 14:07:09\n\
Ventas - Filas leídas: 3\n\
Ventas - Filas procesadas: 1\n\
Stock  - Filas leídas: 0\n\
Stock  - Filas procesadas: 0\n\
Tiempo (s): 0.25\n\
\n\
CODIGOS_NO_ENCONTRADOS\n\
CB9\n\
\n\
DETALLE_INCIDENCIAS\n\
HOJA\tFILA\tCODIGO\tMOTIVO\n\
VENTAS\t4\tCB9\tNo existe en tabla PRODUCTO (codBarraSap).\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_report_placeholders() {
        let result = IncidenceLog::new().summarize("RM", "a.csv", "X", RunDetail::default(), 0.0);
        let text = render_text_report(&result, at());
        assert!(text.contains("CODIGOS_NO_ENCONTRADOS\nSin códigos no encontrados.\n"));
        assert!(text.ends_with("HOJA\tFILA\tCODIGO\tMOTIVO\nSin incidencias.\n"));
        assert_eq!(report_file_name("RM", at()), "incidencias_RM_20240305_140709.txt");
    }

    #[test]
    fn test_report_names_partner() {
        let mut log = IncidenceLog::new();
        log.add("ERROR_FILA", "CB1: UNIQUE constraint failed", 9, "VENTAS");
        let result = log.summarize("DEPRATI", "deprati.xlsx", "MZCL-000009", RunDetail::default(), 0.0);

        let text = render_text_report(&result, at());
        assert!(text.starts_with("INCIDENCIAS DE CARGA DEPRATI\nArchivo: deprati.xlsx\n"));
        assert!(text.ends_with("VENTAS\t9\tERROR_FILA\tCB1: UNIQUE constraint failed\n"));
        assert_eq!(
            report_file_name(&result.partner, at()),
            "incidencias_DEPRATI_20240305_140709.txt"
        );
        assert_eq!(serde_json::to_value(&result).unwrap()["formato"], "DEPRATI");
    }
}
