// ==========================================
// Sell-out 台账系统 - 参考目录实体
// ==========================================
// 职责: 价格缓存行 / 产品身份 / 目录命中结果
// 红线: 导入流程只读，不写目录表
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// PriceCacheEntry - 价格/描述缓存行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCacheEntry {
    pub sap_code: Option<String>, // 目录（SAP）编码
    pub barcode: String,          // 外部条码（已 TRIM）
    pub description: Option<String>,
    pub brand: Option<String>,
}

// ==========================================
// CatalogMatch - 单个编码的完整解析结果
// ==========================================
// 两个参考表都命中时才可入账
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub entry: PriceCacheEntry,
    pub product_id: i64,
}

// ==========================================
// CatalogMiss - 解析失败原因
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMiss {
    NotInPriceCache, // 价格缓存无此条码
    NotInProducts,   // 产品表无此条码
}

impl CatalogMiss {
    /// 事件原因文本
    pub fn reason(&self) -> &'static str {
        match self {
            CatalogMiss::NotInPriceCache => "No existe en SAP_Prod_cache (cod_barra).",
            CatalogMiss::NotInProducts => "No existe en tabla PRODUCTO (codBarraSap).",
        }
    }
}
