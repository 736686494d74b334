// ==========================================
// Sell-out 台账系统 - 台账维护API
// ==========================================
// 职责: 客户范围内的台账查询、修改、删除
// 红线: 其他客户的台账行不可见、不可修改
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::db::open_sqlite_connection;
use crate::domain::{BulkDeleteOutcome, LedgerFilter, LedgerListItem, SalesRecord, SalesRecordUpdate};
use crate::repository::{ClientRepository, LedgerRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 台账维护API
pub struct LedgerApi {
    ledger: LedgerRepository,
    clients: ClientRepository,
}

impl LedgerApi {
    /// 创建新的 LedgerApi 实例
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            ledger: LedgerRepository::from_connection(conn.clone()),
            clients: ClientRepository::from_connection(conn),
        }
    }

    fn require_client_code(client_code: &str) -> ApiResult<&str> {
        let trimmed = client_code.trim();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidInput("客户编码不能为空".to_string()));
        }
        Ok(trimmed)
    }

    /// 分页列出客户台账（按日期倒序，默认 limit=1000）
    pub fn list_records(
        &self,
        client_code: &str,
        filter: &LedgerFilter,
    ) -> ApiResult<Vec<LedgerListItem>> {
        let code = Self::require_client_code(client_code)?;
        Ok(self.ledger.list_for_client(code, filter, true)?)
    }

    /// 列出客户全部台账（忽略分页）
    pub fn list_all_records(
        &self,
        client_code: &str,
        filter: &LedgerFilter,
    ) -> ApiResult<Vec<LedgerListItem>> {
        let code = Self::require_client_code(client_code)?;
        Ok(self.ledger.list_for_client(code, filter, false)?)
    }

    /// 读取单条台账
    pub fn get_record(&self, id: i64, client_code: &str) -> ApiResult<SalesRecord> {
        let code = Self::require_client_code(client_code)?;
        self.ledger
            .find_for_client(id, code)?
            .ok_or_else(|| ApiError::NotFound(format!("Venta no encontrada: {}", id)))
    }

    /// 修改台账（整行替换可编辑字段）
    #[instrument(skip(self, update))]
    pub fn update_record(
        &self,
        id: i64,
        client_code: &str,
        update: &SalesRecordUpdate,
    ) -> ApiResult<SalesRecord> {
        let code = Self::require_client_code(client_code)?;
        if update.product_code.trim().is_empty() {
            return Err(ApiError::ValidationError("codBarra vacío".to_string()));
        }
        if chrono::NaiveDate::from_ymd_opt(update.year, update.month, update.day).is_none() {
            return Err(ApiError::ValidationError(format!(
                "fecha inválida: {}-{}-{}",
                update.year, update.month, update.day
            )));
        }

        let record = self.ledger.update_for_client(id, code, update)?;
        info!(id = id, client_code = %code, "台账行已修改");
        Ok(record)
    }

    /// 删除单条台账
    ///
    /// # 返回
    /// - Ok(false): 不存在或不属于该客户
    pub fn delete_record(&self, id: i64, client_code: &str) -> ApiResult<bool> {
        let code = Self::require_client_code(client_code)?;
        Ok(self.ledger.delete_for_client(id, code)?)
    }

    /// 批量删除
    ///
    /// # 返回
    /// - Ok(BulkDeleteOutcome): 存储失败时 ok=false、deleted=0
    /// - Err(NotFound): 客户不存在
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub fn bulk_delete(&self, ids: &[i64], client_code: &str) -> ApiResult<BulkDeleteOutcome> {
        let code = Self::require_client_code(client_code)?;
        let requested = ids.len();

        if ids.is_empty() {
            return Ok(BulkDeleteOutcome {
                ok: true,
                requested: 0,
                deleted: 0,
                omitted: 0,
                message: "Lista vacía, no se eliminó nada.".to_string(),
            });
        }

        let client = self
            .clients
            .find_by_code(code)?
            .ok_or_else(|| ApiError::NotFound(format!("Cliente no encontrado: {}", code)))?;

        match self.ledger.bulk_delete_for_client(ids, client.id) {
            Ok(deleted) => {
                info!(client_code = %code, deleted = deleted, "批量删除完成");
                Ok(BulkDeleteOutcome {
                    ok: true,
                    requested,
                    deleted,
                    omitted: requested.saturating_sub(deleted),
                    message: "Eliminación masiva completada.".to_string(),
                })
            }
            Err(e) => {
                warn!(client_code = %code, error = %e, "批量删除失败，事务已回滚");
                Ok(BulkDeleteOutcome {
                    ok: false,
                    requested,
                    deleted: 0,
                    omitted: requested,
                    message: format!("Error en eliminación masiva: {}", e),
                })
            }
        }
    }
}
