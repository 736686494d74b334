// ==========================================
// Sell-out 台账系统 - 对账引擎
// ==========================================
// 职责: 按复合业务键决定 插入 / 更新，分批落库
// 红线: 插入与更新的判定只在此处发生
// 规则:
//   - 销售: 命中 → 原地更新销售度量与描述；未命中 → 插入（库存为 0）
//   - 库存: 按键条件更新库存度量；0 行受影响 → 插入（销售为 0）
// 批次: 缓冲到 batch_size 后一个事务写入，每条记录一个 SAVEPOINT
// ==========================================

use crate::domain::sales::SalesRecord;
use crate::domain::types::{DataKind, RecordOutcome};
use crate::repository::error::RepositoryResult;
use crate::repository::ledger_repo::LedgerRepository;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

// ==========================================
// PendingWrite - 缓冲中的待写记录
// ==========================================
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub row_number: i64, // 来源行号（用于失败事件）
    pub record: SalesRecord,
}

/// 单条记录写入失败
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row_number: i64,
    pub product_code: String,
    pub message: String,
}

// ==========================================
// FlushOutcome - 单次落库结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<RowFailure>,
}

impl FlushOutcome {
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

// ==========================================
// ReconciliationEngine - 单个工作表的对账引擎
// ==========================================
pub struct ReconciliationEngine<'a> {
    ledger: &'a LedgerRepository,
    kind: DataKind,
    batch_size: usize,
    buffer: Vec<PendingWrite>,
    flushes: usize,
}

impl<'a> ReconciliationEngine<'a> {
    /// # 参数
    /// - ledger: 台账仓储
    /// - kind: 数据类别（决定销售/库存写入规则）
    /// - batch_size: 每批记录数
    pub fn new(ledger: &'a LedgerRepository, kind: DataKind, batch_size: usize) -> Self {
        Self {
            ledger,
            kind,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            flushes: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// 追加一条记录；缓冲满时自动落库
    ///
    /// # 返回
    /// - Ok(Some(FlushOutcome)): 本次触发了落库
    /// - Ok(None): 仅缓冲
    /// - Err: 整批无法写入（致命）
    pub fn push(&mut self, row_number: i64, mut record: SalesRecord) -> RepositoryResult<Option<FlushOutcome>> {
        // 另一类度量由本引擎置零，插入时不会带入
        match self.kind {
            DataKind::Sales => {
                record.stock_units = 0.0;
                record.stock_value = 0.0;
            }
            DataKind::Stock => {
                record.units_sold = 0.0;
                record.value_sold = 0.0;
            }
        }

        if self.buffer.capacity() == 0 {
            self.buffer.reserve(self.batch_size.min(1024));
        }
        self.buffer.push(PendingWrite { row_number, record });

        if self.buffer.len() >= self.batch_size {
            return self.flush().map(Some);
        }
        Ok(None)
    }

    /// 将缓冲写入数据库并释放缓冲
    pub fn flush(&mut self) -> RepositoryResult<FlushOutcome> {
        if self.buffer.is_empty() {
            return Ok(FlushOutcome::default());
        }

        // 释放容量，不保留大批次占用的内存
        let batch = std::mem::take(&mut self.buffer);
        let kind = self.kind;
        let now = Utc::now();

        let results = self
            .ledger
            .write_batch(&batch, |conn, write| apply_write(conn, kind, &write.record, now))?;

        let mut outcome = FlushOutcome::default();
        for (write, result) in batch.iter().zip(results) {
            match result {
                Ok(RecordOutcome::Inserted) => outcome.inserted += 1,
                Ok(RecordOutcome::Updated) => outcome.updated += 1,
                Err(e) => {
                    warn!(
                        sheet = %kind,
                        row = write.row_number,
                        code = %write.record.product_code,
                        error = %e,
                        "记录写入失败，已单独回滚"
                    );
                    outcome.failures.push(RowFailure {
                        row_number: write.row_number,
                        product_code: write.record.product_code.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.flushes += 1;
        debug!(
            sheet = %kind,
            batch = batch.len(),
            inserted = outcome.inserted,
            updated = outcome.updated,
            failed = outcome.failures.len(),
            "批次落库完成"
        );
        Ok(outcome)
    }
}

/// 单条记录的插入/更新判定（在 SAVEPOINT 连接上执行）
fn apply_write(
    conn: &Connection,
    kind: DataKind,
    record: &SalesRecord,
    now: DateTime<Utc>,
) -> RepositoryResult<RecordOutcome> {
    match kind {
        DataKind::Sales => match LedgerRepository::find_id_by_key(conn, &record.key())? {
            Some(id) => {
                LedgerRepository::update_sales_fields(conn, id, record, now)?;
                Ok(RecordOutcome::Updated)
            }
            None => {
                LedgerRepository::insert_record(conn, record, now)?;
                Ok(RecordOutcome::Inserted)
            }
        },
        DataKind::Stock => {
            if LedgerRepository::update_stock_by_key(conn, record, now)? > 0 {
                Ok(RecordOutcome::Updated)
            } else {
                LedgerRepository::insert_record(conn, record, now)?;
                Ok(RecordOutcome::Inserted)
            }
        }
    }
}
