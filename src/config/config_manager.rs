// ==========================================
// Sell-out 台账系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::ingest_config_trait::IngestConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::DEFAULT_CLIENT_CODE;
use crate::repository::ledger_repo::IN_CHUNK_SIZE;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数配置；格式错误或非正数时回退默认值
    fn get_positive_usize(&self, key: &str, default: usize) -> Result<usize, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = default,
                    "配置值非法，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 导入运行开始时记录到日志，便于复盘
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// IngestConfigReader Trait 实现
// ==========================================
#[async_trait]
impl IngestConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_usize(config_keys::BATCH_SIZE, 5000)
    }

    async fn get_header_scan_depth(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_usize(config_keys::HEADER_SCAN_DEPTH, 30)
    }

    async fn get_lookup_chunk_size(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_positive_usize(config_keys::LOOKUP_CHUNK_SIZE, IN_CHUNK_SIZE)?;
        Ok(value.min(IN_CHUNK_SIZE))
    }

    async fn get_memo_capacity(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_usize(config_keys::MEMO_CAPACITY, 1024)
    }

    async fn get_default_client_code(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_CLIENT_CODE, DEFAULT_CLIENT_CODE)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(DEFAULT_CLIENT_CODE.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 对账批次
    pub const BATCH_SIZE: &str = "ingest/batch_size";

    // 表头识别
    pub const HEADER_SCAN_DEPTH: &str = "ingest/header_scan_depth";

    // 目录解析
    pub const LOOKUP_CHUNK_SIZE: &str = "ingest/lookup_chunk_size";
    pub const MEMO_CAPACITY: &str = "ingest/memo_capacity";

    // 客户
    pub const DEFAULT_CLIENT_CODE: &str = "ingest/default_client_code";
}
