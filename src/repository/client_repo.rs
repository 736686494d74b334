// ==========================================
// Sell-out 台账系统 - 客户注册表仓储
// ==========================================
// 职责: 按业务编码解析客户（只读）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::client::Client;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct ClientRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClientRepository {
    /// 创建新的 ClientRepository 实例
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

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按业务编码查找客户（忽略大小写，编码先 TRIM）
    ///
    /// # 返回
    /// - Ok(Some(Client)): 找到
    /// - Ok(None): 编码未注册
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Client>> {
        let conn = self.get_conn()?;
        let client = conn
            .query_row(
                "SELECT id, code, name FROM client WHERE code = ?1 COLLATE NOCASE LIMIT 1",
                params![code.trim()],
                |row| {
                    Ok(Client {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(client)
    }
}
