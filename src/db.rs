// ==========================================
// Sell-out 台账系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表（台账 / 参考目录 / 客户 / 配置）
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等初始化 schema
///
/// # 表
/// - client: 客户注册表（按业务编码解析）
/// - price_cache: 价格/描述参考缓存（只读）
/// - product: 产品身份表（只读）
/// - sales_ledger: 销售/库存台账，复合业务键唯一
/// - config_kv: 配置键值
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS client (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS price_cache (
            sap_code TEXT,
            barcode TEXT NOT NULL,
            description TEXT,
            brand TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_price_cache_barcode ON price_cache(barcode);

        CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            barcode TEXT NOT NULL,
            name TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_product_barcode ON product(barcode);

        CREATE TABLE IF NOT EXISTS sales_ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id INTEGER NOT NULL REFERENCES client(id),
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            day INTEGER NOT NULL,
            product_code TEXT NOT NULL,
            store_code TEXT NOT NULL,
            store_name TEXT,
            city TEXT,
            brand TEXT,
            product_name TEXT,
            description TEXT,
            sap_code TEXT,
            product_id INTEGER REFERENCES product(id),
            units_sold REAL NOT NULL DEFAULT 0,
            value_sold REAL NOT NULL DEFAULT 0,
            stock_units REAL NOT NULL DEFAULT 0,
            stock_value REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (client_id, year, month, day, product_code, store_code)
        );
        CREATE INDEX IF NOT EXISTS idx_sales_ledger_period
            ON sales_ledger(client_id, year, month);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 默认数据库路径环境变量
pub const DB_PATH_ENV: &str = "SELLOUT_LEDGER_DB_PATH";

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 SELLOUT_LEDGER_DB_PATH（非空时）
/// - 否则: 用户数据目录/sellout-ledger/sellout_ledger.db
/// - 拿不到用户数据目录时: ./sellout_ledger.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./sellout_ledger.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("sellout-ledger");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("sellout_ledger.db");
        }
    }

    path.to_string_lossy().to_string()
}
