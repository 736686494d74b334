// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、参考数据准备等功能
// ==========================================

#![allow(dead_code)]

use rusqlite::{params, Connection};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use sellout_ledger::db::{init_schema, open_sqlite_connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 默认测试客户
pub const TEST_CLIENT: &str = "MZCL-000008";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接
pub fn open_test_conn(db_path: &str) -> Connection {
    open_sqlite_connection(db_path).expect("Failed to open test db")
}

/// 插入客户，返回 id
pub fn seed_client(conn: &Connection, code: &str, name: &str) -> i64 {
    conn.execute(
        "INSERT INTO client (code, name) VALUES (?1, ?2)",
        params![code, name],
    )
    .expect("Failed to insert client");
    conn.last_insert_rowid()
}

/// 插入一个完整目录条目（价格缓存 + 产品），返回产品 id
pub fn seed_catalog(conn: &Connection, barcode: &str, sap_code: &str, description: &str, brand: &str) -> i64 {
    conn.execute(
        "INSERT INTO price_cache (sap_code, barcode, description, brand) VALUES (?1, ?2, ?3, ?4)",
        params![sap_code, barcode, description, brand],
    )
    .expect("Failed to insert price_cache");
    conn.execute(
        "INSERT INTO product (barcode, name) VALUES (?1, ?2)",
        params![barcode, description],
    )
    .expect("Failed to insert product");
    conn.last_insert_rowid()
}

/// 只插入价格缓存（产品表缺失）
pub fn seed_price_only(conn: &Connection, barcode: &str, sap_code: &str) {
    conn.execute(
        "INSERT INTO price_cache (sap_code, barcode, description, brand) VALUES (?1, ?2, 'SOLO CACHE', 'X')",
        params![sap_code, barcode],
    )
    .expect("Failed to insert price_cache");
}

/// 标准测试库: 默认客户 + CB1/CB2 两个目录条目
pub fn create_seeded_db() -> (NamedTempFile, String) {
    let (temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_conn(&db_path);
    seed_client(&conn, TEST_CLIENT, "Cliente RM");
    seed_catalog(&conn, "CB1", "SAP-001", "LECHE ENTERA 1L", "MARCA_A");
    seed_catalog(&conn, "CB2", "SAP-002", "YOGURT FRESA", "MARCA_B");
    (temp_file, db_path)
}

/// 台账总行数
pub fn count_ledger(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM sales_ledger", [], |row| row.get(0))
        .expect("Failed to count ledger")
}

/// 以分号 CSV 构造 RM 销售文件
///
/// 每行格式: fecha_venta;nombre_tienda;ref_proveedor;ventas_en_udd;ventas_en_usd_sin_iva;ciudad
pub fn rm_sales_csv(rows: &[&str]) -> Vec<u8> {
    let mut out = String::from("FECHA_VENTA;NOMBRE_TIENDA;REF_PROVEEDOR;VENTAS_EN_UDD;VENTAS_EN_USD_SIN_IVA;CIUDAD\n");
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out.into_bytes()
}

/// xlsx 夹具单元格
#[derive(Debug, Clone, Copy)]
pub enum XCell<'a> {
    Empty,
    Text(&'a str),
    Number(f64),
    Date(u16, u8, u8), // 按 dd/mm/yyyy 格式写入的日期单元格
}

/// 构造内存中的 .xlsx 工作簿
///
/// # 参数
/// - sheets: (工作表名称, 行列表)，按顺序添加
///
/// # 返回
/// 文件字节
pub fn xlsx_workbook(sheets: &[(&str, Vec<Vec<XCell>>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("Failed to name worksheet");

        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match *cell {
                    XCell::Empty => {}
                    XCell::Text(text) => {
                        worksheet.write_string(r, c, text).expect("Failed to write text");
                    }
                    XCell::Number(n) => {
                        worksheet.write_number(r, c, n).expect("Failed to write number");
                    }
                    XCell::Date(y, m, d) => {
                        let date = ExcelDateTime::from_ymd(y, m, d).expect("Invalid date");
                        worksheet
                            .write_datetime_with_format(r, c, &date, &date_format)
                            .expect("Failed to write date");
                    }
                }
            }
        }
    }

    workbook.save_to_buffer().expect("Failed to save workbook")
}
