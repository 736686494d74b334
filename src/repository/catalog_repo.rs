// ==========================================
// Sell-out 台账系统 - 参考目录仓储
// ==========================================
// 职责: price_cache / product 两张只读参考表的批量查询
// 约束: 每次调用只发一条 IN 查询，分块由调用方负责
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::catalog::PriceCacheEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// CatalogLookup Trait
// ==========================================
// 用途: 目录解析器依赖的批量查询接口
// 实现者: CatalogRepository（rusqlite）
pub trait CatalogLookup: Send + Sync {
    /// 批量查询价格缓存
    ///
    /// # 参数
    /// - barcodes: 条码列表（已 TRIM、去重）
    ///
    /// # 返回
    /// - 命中的缓存行（同一条码多行时只保留最早一行）
    fn find_price_entries(&self, barcodes: &[String]) -> RepositoryResult<Vec<PriceCacheEntry>>;

    /// 批量查询产品身份
    ///
    /// # 返回
    /// - (条码, 产品 id) 列表（同一条码多行时取最小 id）
    fn find_product_ids(&self, barcodes: &[String]) -> RepositoryResult<Vec<(String, i64)>>;
}

pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    /// 创建新的 CatalogRepository 实例
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

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

/// 构建 IN 子句的占位符
fn in_placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

impl CatalogLookup for CatalogRepository {
    fn find_price_entries(&self, barcodes: &[String]) -> RepositoryResult<Vec<PriceCacheEntry>> {
        if barcodes.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let query = format!(
            r#"
            SELECT sap_code, TRIM(barcode), description, brand
            FROM price_cache
            WHERE TRIM(barcode) IN ({})
            ORDER BY rowid
            "#,
            in_placeholders(barcodes.len())
        );

        let mut stmt = conn.prepare(&query)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            barcodes.iter().map(|c| c as &dyn rusqlite::ToSql).collect();

        let rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok(PriceCacheEntry {
                    sap_code: row.get(0)?,
                    barcode: row.get(1)?,
                    description: row.get(2)?,
                    brand: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = std::collections::HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|e| seen.insert(e.barcode.clone()))
            .collect())
    }

    fn find_product_ids(&self, barcodes: &[String]) -> RepositoryResult<Vec<(String, i64)>> {
        if barcodes.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let query = format!(
            r#"
            SELECT TRIM(barcode), MIN(id)
            FROM product
            WHERE TRIM(barcode) IN ({})
            GROUP BY TRIM(barcode)
            "#,
            in_placeholders(barcodes.len())
        );

        let mut stmt = conn.prepare(&query)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            barcodes.iter().map(|c| c as &dyn rusqlite::ToSql).collect();

        let rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
