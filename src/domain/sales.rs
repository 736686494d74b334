// ==========================================
// Sell-out 台账系统 - 销售台账实体
// ==========================================
// 职责: 台账行、复合业务键、门店编码标准化
// 红线: 同一客户内复合业务键唯一
// ==========================================

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 门店为空时使用的哨兵编码
pub const NO_STORE_SENTINEL: &str = "SIN_TIENDA";

/// 标准化门店编码
///
/// # 规则
/// - None / 空串 / 纯空白 → `SIN_TIENDA`
/// - 其他 → TRIM
pub fn normalize_store_code(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NO_STORE_SENTINEL.to_string(),
    }
}

// ==========================================
// LedgerKey - 复合业务键
// ==========================================
// (client, year, month, day, product_code, store_code)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub client_id: i64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub product_code: String,
    pub store_code: String,
}

impl LedgerKey {
    /// 构造业务键（产品编码 TRIM，门店编码标准化）
    pub fn new(client_id: i64, date: NaiveDate, product_code: &str, store: Option<&str>) -> Self {
        Self {
            client_id,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            product_code: product_code.trim().to_string(),
            store_code: normalize_store_code(store),
        }
    }
}

// ==========================================
// SalesRecord - 台账行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    // ===== 主键 =====
    pub id: Option<i64>,

    // ===== 复合业务键 =====
    #[serde(rename = "clienteId")]
    pub client_id: i64,
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "dia")]
    pub day: u32,
    #[serde(rename = "codBarra")]
    pub product_code: String,
    #[serde(rename = "codPdv")]
    pub store_code: String,

    // ===== 门店 / 产品描述 =====
    #[serde(rename = "pdv")]
    pub store_name: Option<String>,
    #[serde(rename = "ciudad")]
    pub city: Option<String>,
    #[serde(rename = "marca")]
    pub brand: Option<String>,
    #[serde(rename = "nombreProducto")]
    pub product_name: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "codigoSap")]
    pub sap_code: Option<String>,
    #[serde(rename = "productoId")]
    pub product_id: Option<i64>,

    // ===== 度量 =====
    #[serde(rename = "ventaUnidad")]
    pub units_sold: f64,
    #[serde(rename = "ventaDolares")]
    pub value_sold: f64,
    #[serde(rename = "stockUnidades")]
    pub stock_units: f64,
    #[serde(rename = "stockDolares")]
    pub stock_value: f64,

    // ===== 审计 =====
    #[serde(rename = "creadoEn")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "actualizadoEn")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SalesRecord {
    /// 以业务键构造一条度量全为 0 的台账行
    pub fn from_key(key: &LedgerKey) -> Self {
        Self {
            id: None,
            client_id: key.client_id,
            year: key.year,
            month: key.month,
            day: key.day,
            product_code: key.product_code.clone(),
            store_code: key.store_code.clone(),
            store_name: None,
            city: None,
            brand: None,
            product_name: None,
            description: None,
            sap_code: None,
            product_id: None,
            units_sold: 0.0,
            value_sold: 0.0,
            stock_units: 0.0,
            stock_value: 0.0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn key(&self) -> LedgerKey {
        LedgerKey {
            client_id: self.client_id,
            year: self.year,
            month: self.month,
            day: self.day,
            product_code: self.product_code.clone(),
            store_code: self.store_code.clone(),
        }
    }
}

// ==========================================
// LedgerListItem - 列表视图（附带客户信息）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerListItem {
    #[serde(flatten)]
    pub record: SalesRecord,
    #[serde(rename = "codCliente")]
    pub client_code: String,
    #[serde(rename = "nombreCliente")]
    pub client_name: Option<String>,
}

// ==========================================
// LedgerFilter - 列表查询条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerFilter {
    #[serde(rename = "anio")]
    pub year: Option<i32>,
    #[serde(rename = "mes")]
    pub month: Option<u32>,
    #[serde(rename = "marca")]
    pub brand: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 列表默认分页大小
pub const DEFAULT_LIST_LIMIT: i64 = 1000;

impl LedgerFilter {
    /// 生效的 limit（缺省或非正数 → 1000）
    pub fn effective_limit(&self) -> i64 {
        match self.limit {
            Some(l) if l > 0 => l,
            _ => DEFAULT_LIST_LIMIT,
        }
    }

    /// 生效的 offset（缺省或负数 → 0）
    pub fn effective_offset(&self) -> i64 {
        match self.offset {
            Some(o) if o >= 0 => o,
            _ => 0,
        }
    }

    /// 品牌过滤（空白视为不过滤）
    pub fn brand_filter(&self) -> Option<&str> {
        self.brand.as_deref().map(str::trim).filter(|b| !b.is_empty())
    }
}

// ==========================================
// SalesRecordUpdate - 人工修改（整行替换可编辑字段）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecordUpdate {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "dia")]
    pub day: u32,
    #[serde(rename = "codBarra")]
    pub product_code: String,
    #[serde(rename = "codPdv")]
    pub store_code: Option<String>,
    #[serde(rename = "pdv")]
    pub store_name: Option<String>,
    #[serde(rename = "ciudad")]
    pub city: Option<String>,
    #[serde(rename = "marca")]
    pub brand: Option<String>,
    #[serde(rename = "nombreProducto")]
    pub product_name: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "codigoSap")]
    pub sap_code: Option<String>,
    #[serde(rename = "productoId")]
    pub product_id: Option<i64>,
    #[serde(rename = "ventaUnidad")]
    pub units_sold: f64,
    #[serde(rename = "ventaDolares")]
    pub value_sold: f64,
    #[serde(rename = "stockUnidades")]
    pub stock_units: f64,
    #[serde(rename = "stockDolares")]
    pub stock_value: f64,
}

// ==========================================
// BulkDeleteOutcome - 批量删除结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDeleteOutcome {
    pub ok: bool,
    #[serde(rename = "solicitados")]
    pub requested: usize,
    #[serde(rename = "deletedCount")]
    pub deleted: usize,
    #[serde(rename = "omitidos")]
    pub omitted: usize,
    #[serde(rename = "mensaje")]
    pub message: String,
}
