// ==========================================
// Sell-out 台账系统 - Sell-out 导入器实现
// ==========================================
// 职责: 整合导入流程，从上传文件到台账
// 流程: 解析 → 表头识别 → 预扫描 → 目录批量解析 → 主处理（对账落库） → 汇总
// 说明: 行级问题记入事件日志；致命错误终止运行，已落库批次保留
// ==========================================

use crate::config::{IngestConfigReader, IngestSettings};
use crate::domain::catalog::CatalogMatch;
use crate::domain::ingestion::{SheetStats, EMPTY_CODE, ROW_ERROR_CODE};
use crate::domain::sales::{LedgerKey, SalesRecord};
use crate::domain::{Client, DataKind, Incidence, IngestionResult, RunDetail};
use crate::engine::reconciliation::{FlushOutcome, ReconciliationEngine};
use crate::importer::catalog_resolver::CatalogResolver;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{parse_workbook, FileFormat, SheetGrid, Workbook};
use crate::importer::header_resolver::{find_header_row, HeaderMap};
use crate::importer::incidence_log::IncidenceLog;
use crate::importer::layout::{PartnerLayout, SheetLayout, StoreAxis};
use crate::importer::row_extractor::{extract_rows, RowCandidate};
use crate::importer::sellout_importer_trait::SellOutImporter;
use crate::repository::{CatalogLookup, ClientRepository, LedgerRepository};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 已定位表头的工作表
struct LocatedSheet<'w> {
    kind: DataKind,
    sheet: &'w SheetGrid,
    header: HeaderMap,
}

// ==========================================
// SellOutImporterImpl - Sell-out 导入器实现
// ==========================================
pub struct SellOutImporterImpl<C, L>
where
    C: IngestConfigReader,
    L: CatalogLookup,
{
    // 配置读取器
    config: C,

    // 数据访问层
    catalog: L,
    ledger: LedgerRepository,
    clients: ClientRepository,

    // 文件布局
    layout: PartnerLayout,
}

impl<C, L> SellOutImporterImpl<C, L>
where
    C: IngestConfigReader,
    L: CatalogLookup,
{
    /// 创建新的导入器（默认 RM 布局）
    ///
    /// # 参数
    /// - config: 配置读取器
    /// - catalog: 参考目录查询
    /// - ledger: 台账仓储
    /// - clients: 客户仓储
    pub fn new(config: C, catalog: L, ledger: LedgerRepository, clients: ClientRepository) -> Self {
        Self::with_layout(config, catalog, ledger, clients, PartnerLayout::default())
    }

    /// 使用指定伙伴布局创建导入器
    pub fn with_layout(
        config: C,
        catalog: L,
        ledger: LedgerRepository,
        clients: ClientRepository,
        layout: PartnerLayout,
    ) -> Self {
        Self {
            config,
            catalog,
            ledger,
            clients,
            layout,
        }
    }

    // ==========================================
    // 运行主体（同步执行）
    // ==========================================

    fn run(
        &self,
        bytes: &[u8],
        file_name: &str,
        client_code: &str,
        settings: &IngestSettings,
        log: &mut IncidenceLog,
        detail: &mut RunDetail,
    ) -> ImportResult<()> {
        // === 步骤 2: 解析客户 ===
        let client = self
            .clients
            .find_by_code(client_code)?
            .ok_or_else(|| ImportError::ClientNotFound(client_code.to_string()))?;
        debug!(client_id = client.id, client_code = %client.code, "客户解析完成");

        // === 步骤 3: 解析工作簿 ===
        let workbook = parse_workbook(bytes, file_name)?;
        info!(sheets = workbook.sheets().len(), "工作簿解析完成");

        let located = self.locate_sheets(&workbook, settings, log);

        // === 步骤 4: 预扫描 ===
        let mut codes = BTreeSet::new();
        for target in &located {
            for row in extract_rows(target.sheet, &target.header) {
                codes.extend(row.candidates().iter().map(|c| c.code.clone()));
            }
        }
        debug!(distinct_codes = codes.len(), "预扫描完成");

        // === 步骤 5: 目录批量解析 ===
        let mut resolver =
            CatalogResolver::new(&self.catalog, settings.lookup_chunk_size, settings.memo_capacity);
        resolver
            .prefetch(&codes)
            .map_err(|e| ImportError::CatalogLookupError(e.to_string()))?;

        // === 步骤 6: 主处理 ===
        for target in &located {
            self.process_sheet(target, &client, settings, &mut resolver, log, detail.stats_mut(target.kind))?;
            let stats = detail.stats(target.kind);
            info!(
                sheet = %target.kind,
                rows_read = stats.rows_read,
                rows_processed = stats.rows_processed,
                inserted = stats.inserted,
                updated = stats.updated,
                fallbacks = stats.coercion_fallbacks,
                "工作表处理完成"
            );
        }

        Ok(())
    }

    /// 定位销售/库存工作表及其表头；结构问题记为 GENERAL 事件
    fn locate_sheets<'w>(
        &self,
        workbook: &'w Workbook,
        settings: &IngestSettings,
        log: &mut IncidenceLog,
    ) -> Vec<LocatedSheet<'w>> {
        let mut located = Vec::new();

        for kind in [DataKind::Sales, DataKind::Stock] {
            // 伙伴布局不含该类数据
            let Some(layout) = self.layout.sheet(kind) else {
                continue;
            };
            let Some(sheet) = select_sheet(workbook, layout) else {
                if !layout.optional {
                    warn!(sheet = %kind, "工作表不存在");
                    log.add_general(format!("No se encontró la hoja {}.", kind.sheet_label()), kind.sheet_label());
                }
                continue;
            };

            match find_header_row(sheet, layout, settings.header_scan_depth) {
                Some(header) if layout.store_axis != StoreAxis::Column && header.stores().is_empty() => {
                    warn!(sheet = %kind, sheet_name = %sheet.name(), "未找到门店行，跳过工作表");
                    log.add_general(layout.missing_stores_reason(), kind.sheet_label());
                }
                Some(header) => located.push(LocatedSheet { kind, sheet, header }),
                None => {
                    warn!(sheet = %kind, sheet_name = %sheet.name(), "未找到表头，跳过工作表");
                    log.add_general(layout.missing_header_reason(), kind.sheet_label());
                }
            }
        }

        located
    }

    /// 主处理单个工作表
    fn process_sheet(
        &self,
        target: &LocatedSheet<'_>,
        client: &Client,
        settings: &IngestSettings,
        resolver: &mut CatalogResolver<'_, L>,
        log: &mut IncidenceLog,
        stats: &mut SheetStats,
    ) -> ImportResult<()> {
        let label = target.kind.sheet_label();
        let mut engine = ReconciliationEngine::new(&self.ledger, target.kind, settings.batch_size);

        for row in extract_rows(target.sheet, &target.header) {
            if !row.counts_as_read() {
                continue;
            }
            stats.rows_read += 1;
            stats.coercion_fallbacks += row.fallbacks;

            if let Some(incidence) = row.incidence(label) {
                if incidence.code == EMPTY_CODE {
                    log.mark_unmatched(EMPTY_CODE);
                }
                log.push(incidence);
                continue;
            }

            // 汇总行 / 无度量行没有候选
            for candidate in row.candidates() {
                let resolution = resolver
                    .resolve(&candidate.code)
                    .map_err(|e| ImportError::CatalogLookupError(e.to_string()))?;

                match resolution {
                    Ok(hit) => {
                        let record = build_record(client.id, target.kind, candidate, &hit);
                        if let Some(outcome) = engine.push(row.row_number, record)? {
                            absorb_flush(outcome, label, stats, log);
                        }
                    }
                    Err(miss) => {
                        log.add(candidate.code.as_str(), miss.reason(), row.row_number, label);
                        log.mark_unmatched(candidate.code.as_str());
                    }
                }
            }
        }

        let outcome = engine.flush()?;
        absorb_flush(outcome, label, stats, log);
        debug!(sheet = %label, flushes = engine.flush_count(), "对账引擎落库结束");

        Ok(())
    }
}

/// 按布局选择工作表（指定名称优先，必要时退回第一张）
fn select_sheet<'w>(workbook: &'w Workbook, layout: &SheetLayout) -> Option<&'w SheetGrid> {
    workbook.sheet_by_name(&layout.sheet_name).or_else(|| {
        if layout.fallback_to_first {
            workbook.first_sheet()
        } else {
            None
        }
    })
}

/// 候选行 + 目录命中 → 台账行
///
/// 目录信息优先，文件自带的品牌/名称只补空；
/// 门店名称取列组名称，否则沿用标准化后的门店编码
fn build_record(client_id: i64, kind: DataKind, candidate: &RowCandidate, hit: &CatalogMatch) -> SalesRecord {
    let key = LedgerKey::new(client_id, candidate.date, &candidate.code, candidate.store.as_deref());
    let mut record = SalesRecord::from_key(&key);

    record.store_name = Some(
        candidate
            .store_name
            .clone()
            .unwrap_or_else(|| key.store_code.clone()),
    );
    record.city = candidate.city.clone();
    record.brand = hit.entry.brand.clone().or_else(|| candidate.brand.clone());
    record.product_name = hit
        .entry
        .description
        .clone()
        .or_else(|| candidate.product_name.clone());
    record.description = record.product_name.clone();
    record.sap_code = hit.entry.sap_code.clone();
    record.product_id = Some(hit.product_id);

    match kind {
        DataKind::Sales => {
            record.units_sold = candidate.units;
            record.value_sold = candidate.value;
        }
        DataKind::Stock => {
            record.stock_units = candidate.units;
            record.stock_value = candidate.value;
        }
    }

    record
}

/// 合并单次落库结果：计数 + 单条失败事件
fn absorb_flush(outcome: FlushOutcome, sheet: &str, stats: &mut SheetStats, log: &mut IncidenceLog) {
    stats.inserted += outcome.inserted;
    stats.updated += outcome.updated;
    stats.rows_processed += outcome.written();

    for failure in outcome.failures {
        let reason = format!("{}: {}", failure.product_code, failure.message);
        log.add(ROW_ERROR_CODE, reason, failure.row_number, sheet);
    }
}

// ==========================================
// SellOutImporter Trait 实现
// ==========================================
#[async_trait]
impl<C, L> SellOutImporter for SellOutImporterImpl<C, L>
where
    C: IngestConfigReader,
    L: CatalogLookup,
{
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn ingest(
        &self,
        bytes: &[u8],
        file_name: &str,
        client_code: Option<&str>,
    ) -> ImportResult<IngestionResult> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        // 传输层错误：不进入运行汇总
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile(file_name.to_string()));
        }
        FileFormat::from_file_name(file_name)?;

        // === 步骤 1: 读取配置 ===
        let settings = IngestSettings::load(&self.config)
            .await
            .map_err(|e| ImportError::ConfigReadError(e.to_string()))?;

        // 显式参数 → 伙伴专属客户 → 配置默认值
        let client_code = client_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| self.layout.client_code.clone())
            .unwrap_or_else(|| settings.default_client_code.clone());

        info!(
            run_id = %run_id,
            file_name = %file_name,
            client_code = %client_code,
            partner = %self.layout.name,
            batch_size = settings.batch_size,
            "开始导入 sell-out 文件"
        );

        let mut log = IncidenceLog::new();
        let mut detail = RunDetail {
            run_id: run_id.clone(),
            ..Default::default()
        };

        if let Err(e) = self.run(bytes, file_name, &client_code, &settings, &mut log, &mut detail) {
            error!(run_id = %run_id, error = %e, "导入运行终止");
            log.push(Incidence::fatal(e.fatal_detail()));
        }

        // === 步骤 7: 汇总 ===
        let elapsed = started.elapsed().as_secs_f64();
        let result = log.summarize(&self.layout.name, file_name, &client_code, detail, elapsed);

        info!(
            run_id = %run_id,
            ok = result.ok,
            sales_read = result.sales_rows_read,
            sales_processed = result.sales_rows_processed,
            stock_read = result.stock_rows_read,
            stock_processed = result.stock_rows_processed,
            unmatched = result.unmatched_codes.len(),
            incidences = result.incidences.len(),
            elapsed_s = elapsed,
            "导入完成"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconciliation::RowFailure;

    #[test]
    fn test_flush_failures_name_product_code() {
        let mut stats = SheetStats::default();
        let mut log = IncidenceLog::new();
        let outcome = FlushOutcome {
            inserted: 2,
            updated: 1,
            failures: vec![RowFailure {
                row_number: 7,
                product_code: "CB1".to_string(),
                message: "FOREIGN KEY constraint failed".to_string(),
            }],
        };

        absorb_flush(outcome, "VENTAS", &mut stats, &mut log);

        assert_eq!(stats.rows_processed, 3);
        assert_eq!((stats.inserted, stats.updated), (2, 1));
        let incidence = &log.incidences()[0];
        assert_eq!(incidence.code, ROW_ERROR_CODE);
        assert_eq!(incidence.row, 7);
        assert_eq!(incidence.reason, "CB1: FOREIGN KEY constraint failed");
        // 单条失败不影响 ok
        assert!(!log.has_general());
    }

    #[test]
    fn test_catalog_fills_before_file_metadata() {
        use crate::domain::catalog::PriceCacheEntry;
        use chrono::NaiveDate;

        let candidate = RowCandidate {
            row_number: 5,
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            store: Some("Tienda 101".to_string()),
            store_name: Some("Mall del Sol".to_string()),
            code: "CB1".to_string(),
            units: 2.0,
            value: 5.0,
            city: None,
            brand: Some("MARCA_ARCHIVO".to_string()),
            product_name: Some("Leche archivo".to_string()),
        };
        let hit = CatalogMatch {
            entry: PriceCacheEntry {
                sap_code: Some("SAP-001".to_string()),
                barcode: "CB1".to_string(),
                description: None,
                brand: Some("MARCA_A".to_string()),
            },
            product_id: 11,
        };

        let record = build_record(1, DataKind::Sales, &candidate, &hit);
        assert_eq!(record.store_code, "Tienda 101");
        assert_eq!(record.store_name.as_deref(), Some("Mall del Sol"));
        assert_eq!(record.brand.as_deref(), Some("MARCA_A"));
        assert_eq!(record.product_name.as_deref(), Some("Leche archivo"));
        assert_eq!(record.description.as_deref(), Some("Leche archivo"));
        assert_eq!((record.units_sold, record.stock_units), (2.0, 0.0));
    }
}
