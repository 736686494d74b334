// ==========================================
// Sell-out 台账系统 - 工作表布局定义
// ==========================================
// 职责: 声明式字段别名表（字段 → 有序别名列表）
// 说明: 布局是数据而非代码；新伙伴格式只需新增一份 PartnerLayout
// ==========================================

use crate::domain::client::DEPRATI_CLIENT_CODE;
use crate::domain::DataKind;
use crate::importer::cell_coercion::ScalarKind;
use crate::importer::header_resolver::normalize_header;

// ==========================================
// Field - 逻辑字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Store,
    Code,
    Units,
    Value,
    City,
    Brand,
    ProductName,
}

impl Field {
    /// 字段的单元格目标类型（日期另行解析）
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Field::Date => None,
            Field::Units | Field::Value => Some(ScalarKind::Decimal),
            Field::Store | Field::Code | Field::City | Field::Brand | Field::ProductName => {
                Some(ScalarKind::Text)
            }
        }
    }
}

// ==========================================
// StoreAxis - 门店在工作表中的位置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAxis {
    /// 门店是表头中的一列（每行一个门店）
    Column,
    /// 门店横向展开: 表头上方一行为门店代码，下一行为门店名称；
    /// 每个门店占两列（单位, 金额）
    Pivoted { marker: String },
}

// ==========================================
// FieldSpec - 单个字段的别名配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub aliases: Vec<String>, // 已标准化，按优先级排列
    pub required: bool,
}

impl FieldSpec {
    /// 构造字段配置（别名在此统一标准化）
    pub fn new(field: Field, aliases: &[&str], required: bool) -> Self {
        Self {
            field,
            aliases: aliases.iter().map(|a| normalize_header(a)).collect(),
            required,
        }
    }

    pub fn required(field: Field, aliases: &[&str]) -> Self {
        Self::new(field, aliases, true)
    }

    pub fn optional(field: Field, aliases: &[&str]) -> Self {
        Self::new(field, aliases, false)
    }

    /// 首选别名（用于缺失表头的提示）
    pub fn primary_alias(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or("")
    }
}

// ==========================================
// SheetLayout - 单个工作表的布局
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub kind: DataKind,
    pub sheet_name: String,
    pub fallback_to_first: bool, // 找不到指定名称时退回第一张工作表
    pub optional: bool,          // 工作表缺失时不处理、不记事件
    pub store_axis: StoreAxis,
    pub data_offset: usize, // 表头与首个数据行之间的间隔行数
    pub fields: Vec<FieldSpec>,
}

impl SheetLayout {
    pub fn field(&self, field: Field) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.field == field)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// 找不到表头时的事件原因
    pub fn missing_header_reason(&self) -> String {
        let required: Vec<&str> = self.required_fields().map(|f| f.primary_alias()).collect();
        format!(
            "No se encontró encabezado de {} (requiere {}).",
            self.kind.sheet_label(),
            required.join(", ")
        )
    }

    /// 横向门店布局中找不到门店行时的事件原因
    pub fn missing_stores_reason(&self) -> String {
        match &self.store_axis {
            StoreAxis::Pivoted { marker } => format!(
                "No se encontró una fila con celdas que contengan '{}'.",
                capitalize(marker)
            ),
            StoreAxis::Column => String::new(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ==========================================
// PartnerLayout - 一个零售伙伴的文件布局
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerLayout {
    pub name: String,                // 报告标题与文件名中的伙伴标识
    pub client_code: Option<String>, // 伙伴专属客户；None 时使用配置默认值
    pub sales: SheetLayout,
    pub stock: Option<SheetLayout>,
}

impl PartnerLayout {
    pub fn sheet(&self, kind: DataKind) -> Option<&SheetLayout> {
        match kind {
            DataKind::Sales => Some(&self.sales),
            DataKind::Stock => self.stock.as_ref(),
        }
    }

    /// 按名称查找内置布局（不区分大小写）
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "RM" => Some(Self::rm()),
            "DEPRATI" => Some(Self::deprati()),
            _ => None,
        }
    }

    /// RM 格式: 每行一个门店，VENTAS + 可选 STOCK
    pub fn rm() -> Self {
        let code_aliases: &[&str] = &[
            "ref_proveedor",
            "cod_barra",
            "codigo_de_barras",
            "no_mat_proveedor",
        ];

        let sales = SheetLayout {
            kind: DataKind::Sales,
            sheet_name: DataKind::Sales.sheet_label().to_string(),
            fallback_to_first: true,
            optional: false,
            store_axis: StoreAxis::Column,
            data_offset: 0,
            fields: vec![
                FieldSpec::required(Field::Date, &["fecha_venta", "fecha", "dia_natural"]),
                FieldSpec::required(Field::Store, &["nombre_tienda", "tienda", "pdv"]),
                FieldSpec::required(Field::Code, code_aliases),
                FieldSpec::optional(Field::Units, &["ventas_en_udd", "venta_unidades"]),
                FieldSpec::optional(
                    Field::Value,
                    &["ventas_en_usd_sin_iva", "venta_dolares"],
                ),
                FieldSpec::optional(Field::City, &["ciudad"]),
            ],
        };

        let stock = SheetLayout {
            kind: DataKind::Stock,
            sheet_name: DataKind::Stock.sheet_label().to_string(),
            fallback_to_first: false,
            optional: true,
            store_axis: StoreAxis::Column,
            data_offset: 0,
            fields: vec![
                FieldSpec::required(Field::Date, &["fecha_corte", "fecha"]),
                FieldSpec::required(Field::Store, &["tienda", "nombre_tienda"]),
                FieldSpec::required(Field::Code, code_aliases),
                FieldSpec::optional(Field::Units, &["cantidad_unidades", "stock_unidades"]),
                FieldSpec::optional(Field::Value, &["cantidad_dolares", "stock_dolares"]),
                FieldSpec::optional(Field::City, &["ciudad"]),
            ],
        };

        Self {
            name: "RM".to_string(),
            client_code: None,
            sales,
            stock: Some(stock),
        }
    }

    /// Deprati 格式: 仅销售，第一张工作表；门店横向展开
    ///
    /// 表头行下方有一行单位说明，数据从其后开始
    pub fn deprati() -> Self {
        let sales = SheetLayout {
            kind: DataKind::Sales,
            sheet_name: DataKind::Sales.sheet_label().to_string(),
            fallback_to_first: true,
            optional: false,
            store_axis: StoreAxis::Pivoted {
                marker: "tienda".to_string(),
            },
            data_offset: 1,
            fields: vec![
                FieldSpec::required(Field::Date, &["dia_natural", "fecha", "fecha_venta", "date"]),
                FieldSpec::required(
                    Field::Code,
                    &["codigo_de_barras", "cod_barra", "no_mat_proveedor"],
                ),
                FieldSpec::required(Field::Brand, &["marca", "brand", "marcas"]),
                FieldSpec::required(
                    Field::ProductName,
                    &["nombre_producto", "producto", "descripcion", "descripciones"],
                ),
            ],
        };

        Self {
            name: "DEPRATI".to_string(),
            client_code: Some(DEPRATI_CLIENT_CODE.to_string()),
            sales,
            stock: None,
        }
    }
}

/// 默认伙伴布局（RM 格式）
impl Default for PartnerLayout {
    fn default() -> Self {
        Self::rm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_required_fields() {
        let layout = PartnerLayout::default();
        let sales: Vec<Field> = layout.sales.required_fields().map(|f| f.field).collect();
        assert_eq!(sales, vec![Field::Date, Field::Store, Field::Code]);
        let stock = layout.stock.as_ref().unwrap();
        assert!(stock.optional);
        assert!(layout.sales.fallback_to_first);
        assert_eq!(layout.sales.store_axis, StoreAxis::Column);
        assert_eq!(stock.field(Field::Date).unwrap().primary_alias(), "fecha_corte");
        assert_eq!(layout.name, "RM");
        assert!(layout.client_code.is_none());
    }

    #[test]
    fn test_missing_header_reason() {
        let layout = PartnerLayout::default();
        assert_eq!(
            layout.sales.missing_header_reason(),
            "No se encontró encabezado de VENTAS (requiere fecha_venta, nombre_tienda, ref_proveedor)."
        );
        assert_eq!(
            layout.sheet(DataKind::Stock).unwrap().missing_header_reason(),
            "No se encontró encabezado de STOCK (requiere fecha_corte, tienda, ref_proveedor)."
        );
    }

    #[test]
    fn test_deprati_layout() {
        let layout = PartnerLayout::by_name(" deprati ").unwrap();
        assert_eq!(layout.name, "DEPRATI");
        assert_eq!(layout.client_code.as_deref(), Some(DEPRATI_CLIENT_CODE));
        assert!(layout.sheet(DataKind::Stock).is_none());
        assert_eq!(layout.sales.data_offset, 1);
        assert!(layout.sales.field(Field::Store).is_none());
        assert_eq!(
            layout.sales.missing_stores_reason(),
            "No se encontró una fila con celdas que contengan 'Tienda'."
        );
        assert!(PartnerLayout::by_name("fybeca").is_none());
        assert_eq!(PartnerLayout::by_name("rm"), Some(PartnerLayout::default()));
    }

    #[test]
    fn test_field_scalar_kinds() {
        assert_eq!(Field::Units.scalar_kind(), Some(ScalarKind::Decimal));
        assert_eq!(Field::Brand.scalar_kind(), Some(ScalarKind::Text));
        assert_eq!(Field::Date.scalar_kind(), None);
    }
}
