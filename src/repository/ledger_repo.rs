// ==========================================
// Sell-out 台账系统 - 销售台账仓储
// ==========================================
// 职责: sales_ledger 表的 SQL 原语 + 客户范围内的 CRUD
// 红线: 不含业务规则（插入/更新的判定由对账引擎负责）
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::sales::{
    normalize_store_code, LedgerFilter, LedgerKey, LedgerListItem, SalesRecord, SalesRecordUpdate,
};
use crate::domain::types::RecordOutcome;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// IN 子句单次最多绑定的参数个数
pub const IN_CHUNK_SIZE: usize = 900;

const RECORD_COLUMNS: &str = r#"
    l.id, l.client_id, l.year, l.month, l.day, l.product_code, l.store_code,
    l.store_name, l.city, l.brand, l.product_name, l.description, l.sap_code, l.product_id,
    l.units_sold, l.value_sold, l.stock_units, l.stock_value, l.created_at, l.updated_at
"#;

fn map_record(row: &Row) -> rusqlite::Result<SalesRecord> {
    Ok(SalesRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        day: row.get(4)?,
        product_code: row.get(5)?,
        store_code: row.get(6)?,
        store_name: row.get(7)?,
        city: row.get(8)?,
        brand: row.get(9)?,
        product_name: row.get(10)?,
        description: row.get(11)?,
        sap_code: row.get(12)?,
        product_id: row.get(13)?,
        units_sold: row.get(14)?,
        value_sold: row.get(15)?,
        stock_units: row.get(16)?,
        stock_value: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

// ==========================================
// LedgerRepository - 销售台账仓储
// ==========================================
pub struct LedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerRepository {
    /// 创建新的 LedgerRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内 SQL 原语（供对账引擎组合）
    // ==========================================

    /// 按复合业务键查找台账行 id
    pub fn find_id_by_key(conn: &Connection, key: &LedgerKey) -> RepositoryResult<Option<i64>> {
        let id = conn
            .query_row(
                r#"
                SELECT id FROM sales_ledger
                WHERE client_id = ?1 AND year = ?2 AND month = ?3 AND day = ?4
                  AND product_code = ?5 AND store_code = ?6
                "#,
                params![
                    key.client_id,
                    key.year,
                    key.month,
                    key.day,
                    key.product_code,
                    key.store_code
                ],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    /// 插入新台账行
    ///
    /// # 返回
    /// - Ok(i64): 新行 id
    pub fn insert_record(
        conn: &Connection,
        record: &SalesRecord,
        now: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO sales_ledger (
                client_id, year, month, day, product_code, store_code,
                store_name, city, brand, product_name, description, sap_code, product_id,
                units_sold, value_sold, stock_units, stock_value, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18
            )
            "#,
            params![
                record.client_id,
                record.year,
                record.month,
                record.day,
                record.product_code,
                record.store_code,
                record.store_name,
                record.city,
                record.brand,
                record.product_name,
                record.description,
                record.sap_code,
                record.product_id,
                record.units_sold,
                record.value_sold,
                record.stock_units,
                record.stock_value,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新销售度量及描述字段（不触碰库存字段）
    pub fn update_sales_fields(
        conn: &Connection,
        id: i64,
        record: &SalesRecord,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            UPDATE sales_ledger SET
                units_sold = ?2,
                value_sold = ?3,
                brand = ?4,
                product_name = ?5,
                description = ?6,
                sap_code = ?7,
                product_id = ?8,
                store_name = ?9,
                city = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                id,
                record.units_sold,
                record.value_sold,
                record.brand,
                record.product_name,
                record.description,
                record.sap_code,
                record.product_id,
                record.store_name,
                record.city,
                now,
            ],
        )?;
        Ok(affected)
    }

    /// 按复合业务键条件更新库存度量（不触碰销售字段）
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数（0 表示键不存在）
    pub fn update_stock_by_key(
        conn: &Connection,
        record: &SalesRecord,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            UPDATE sales_ledger SET
                stock_units = ?7,
                stock_value = ?8,
                updated_at = ?9
            WHERE client_id = ?1 AND year = ?2 AND month = ?3 AND day = ?4
              AND product_code = ?5 AND store_code = ?6
            "#,
            params![
                record.client_id,
                record.year,
                record.month,
                record.day,
                record.product_code,
                record.store_code,
                record.stock_units,
                record.stock_value,
                now,
            ],
        )?;
        Ok(affected)
    }

    /// 在单个事务内逐条写入，每条记录一个 SAVEPOINT
    ///
    /// # 参数
    /// - items: 待写入条目
    /// - apply: 单条写入逻辑（在 SAVEPOINT 连接上执行）
    ///
    /// # 返回
    /// - Ok(Vec<..>): 与 items 一一对应的单条结果；失败条目已单独回滚
    /// - Err: 事务无法开启/提交（整批失败）
    pub fn write_batch<T, F>(
        &self,
        items: &[T],
        mut apply: F,
    ) -> RepositoryResult<Vec<RepositoryResult<RecordOutcome>>>
    where
        F: FnMut(&Connection, &T) -> RepositoryResult<RecordOutcome>,
    {
        let conn = self.get_conn()?;
        let mut tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let mut sp = tx
                .savepoint()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

            match apply(&*sp, item) {
                Ok(outcome) => {
                    sp.commit()
                        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                    results.push(Ok(outcome));
                }
                Err(e) => {
                    sp.rollback()
                        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                    results.push(Err(e));
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(results)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按复合业务键读取台账行
    pub fn find_by_key(&self, key: &LedgerKey) -> RepositoryResult<Option<SalesRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM sales_ledger l
            WHERE l.client_id = ?1 AND l.year = ?2 AND l.month = ?3 AND l.day = ?4
              AND l.product_code = ?5 AND l.store_code = ?6
            "#,
            RECORD_COLUMNS
        );
        let record = conn
            .query_row(
                &sql,
                params![
                    key.client_id,
                    key.year,
                    key.month,
                    key.day,
                    key.product_code,
                    key.store_code
                ],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// 统计客户台账行数
    pub fn count_for_client(&self, client_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sales_ledger WHERE client_id = ?1",
            params![client_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 按客户编码列出台账
    ///
    /// # 参数
    /// - client_code: 客户业务编码
    /// - filter: 年/月/品牌过滤与分页
    /// - paged: false 时忽略 limit/offset
    ///
    /// # 排序
    /// - 年、月、日、id 全部倒序
    pub fn list_for_client(
        &self,
        client_code: &str,
        filter: &LedgerFilter,
        paged: bool,
    ) -> RepositoryResult<Vec<LedgerListItem>> {
        let conn = self.get_conn()?;

        let mut sql = format!(
            r#"
            SELECT {}, c.code, c.name
            FROM sales_ledger l
            JOIN client c ON c.id = l.client_id
            WHERE c.code = ? COLLATE NOCASE
            "#,
            RECORD_COLUMNS
        );
        let mut args: Vec<Value> = vec![Value::Text(client_code.trim().to_string())];

        if let Some(year) = filter.year {
            sql.push_str(" AND l.year = ?");
            args.push(Value::Integer(year as i64));
        }
        if let Some(month) = filter.month {
            sql.push_str(" AND l.month = ?");
            args.push(Value::Integer(month as i64));
        }
        if let Some(brand) = filter.brand_filter() {
            sql.push_str(" AND l.brand = ?");
            args.push(Value::Text(brand.to_string()));
        }

        sql.push_str(" ORDER BY l.year DESC, l.month DESC, l.day DESC, l.id DESC");

        if paged {
            sql.push_str(" LIMIT ? OFFSET ?");
            args.push(Value::Integer(filter.effective_limit()));
            args.push(Value::Integer(filter.effective_offset()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(LedgerListItem {
                    record: map_record(row)?,
                    client_code: row.get(20)?,
                    client_name: row.get(21)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// 读取属于指定客户的台账行
    pub fn find_for_client(
        &self,
        id: i64,
        client_code: &str,
    ) -> RepositoryResult<Option<SalesRecord>> {
        let conn = self.get_conn()?;
        Self::find_for_client_on(&conn, id, client_code)
    }

    fn find_for_client_on(
        conn: &Connection,
        id: i64,
        client_code: &str,
    ) -> RepositoryResult<Option<SalesRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM sales_ledger l
            JOIN client c ON c.id = l.client_id
            WHERE l.id = ?1 AND c.code = ?2 COLLATE NOCASE
            "#,
            RECORD_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![id, client_code.trim()], map_record)
            .optional()?;
        Ok(record)
    }

    // ==========================================
    // 人工维护
    // ==========================================

    /// 修改台账行（必须属于请求客户；门店编码重新标准化）
    ///
    /// # 返回
    /// - Ok(SalesRecord): 修改后的行
    /// - Err(NotFound): id 不存在
    /// - Err(BusinessRuleViolation): 行属于其他客户
    /// - Err(UniqueConstraintViolation): 修改后的业务键与已有行冲突
    pub fn update_for_client(
        &self,
        id: i64,
        client_code: &str,
        update: &SalesRecordUpdate,
    ) -> RepositoryResult<SalesRecord> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let owner: Option<String> = tx
            .query_row(
                r#"
                SELECT c.code FROM sales_ledger l
                JOIN client c ON c.id = l.client_id
                WHERE l.id = ?1
                "#,
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match owner {
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "SalesRecord".to_string(),
                    id: id.to_string(),
                })
            }
            Some(code) if !code.eq_ignore_ascii_case(client_code.trim()) => {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "Venta no pertenece al cliente: {}",
                    client_code
                )))
            }
            Some(_) => {}
        }

        tx.execute(
            r#"
            UPDATE sales_ledger SET
                year = ?2, month = ?3, day = ?4,
                product_code = ?5, store_code = ?6, store_name = ?7, city = ?8,
                brand = ?9, product_name = ?10, description = ?11, sap_code = ?12,
                product_id = ?13,
                units_sold = ?14, value_sold = ?15, stock_units = ?16, stock_value = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
            params![
                id,
                update.year,
                update.month,
                update.day,
                update.product_code.trim(),
                normalize_store_code(update.store_code.as_deref()),
                update.store_name,
                update.city,
                update.brand,
                update.product_name,
                update.description,
                update.sap_code,
                update.product_id,
                update.units_sold,
                update.value_sold,
                update.stock_units,
                update.stock_value,
                Utc::now(),
            ],
        )?;

        let record = Self::find_for_client_on(&tx, id, client_code)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "SalesRecord".to_string(),
                id: id.to_string(),
            }
        })?;

        tx.commit()?;
        Ok(record)
    }

    /// 删除属于指定客户的台账行
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 不存在或不属于该客户
    pub fn delete_for_client(&self, id: i64, client_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            DELETE FROM sales_ledger
            WHERE id = ?1
              AND client_id IN (SELECT id FROM client WHERE code = ?2 COLLATE NOCASE)
            "#,
            params![id, client_code.trim()],
        )?;
        Ok(affected > 0)
    }

    /// 批量删除（只删除属于该客户的行，单事务）
    ///
    /// # 返回
    /// - Ok(usize): 实际删除行数
    /// - Err: 数据库错误（整个事务回滚，不存在部分删除）
    pub fn bulk_delete_for_client(&self, ids: &[i64], client_id: i64) -> RepositoryResult<usize> {
        let mut unique: Vec<i64> = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        for chunk in unique.chunks(IN_CHUNK_SIZE) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "DELETE FROM sales_ledger WHERE client_id = ? AND id IN ({})",
                placeholders
            );
            let mut args: Vec<Value> = Vec::with_capacity(chunk.len() + 1);
            args.push(Value::Integer(client_id));
            args.extend(chunk.iter().map(|id| Value::Integer(*id)));
            deleted += tx.execute(&sql, params_from_iter(args.iter()))?;
        }

        tx.commit()?;
        Ok(deleted)
    }
}
