// ==========================================
// Sell-out 台账系统 - 单元格类型转换
// ==========================================
// 职责: 原始单元格 → 文本 / 数值 / 日期
// 原则: 永不报错；兜底值可观测（来源标记 + debug 日志 + 计数）
// ==========================================

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

// ==========================================
// Cell - 原始单元格
// ==========================================
// 公式单元格以其缓存结果出现
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(f64), // 日期格式的数值单元格（序列号）
    Bool(bool),
    Error(String),
}

impl Cell {
    /// 是否为空白（空 / 纯空白文本）
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 仅文本单元格参与表头识别
    pub fn header_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// ==========================================
// 转换结果来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionOrigin {
    Parsed,   // 按值解析成功
    Blank,    // 单元格为空
    Fallback, // 解析失败，使用默认值
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub origin: CoercionOrigin,
}

impl<T> Coerced<T> {
    fn parsed(value: T) -> Self {
        Self {
            value,
            origin: CoercionOrigin::Parsed,
        }
    }

    fn blank(value: T) -> Self {
        Self {
            value,
            origin: CoercionOrigin::Blank,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            origin: CoercionOrigin::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == CoercionOrigin::Fallback
    }
}

/// 请求的目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Integer,
    Decimal,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Decimal(f64),
    Text(Option<String>),
}

impl Scalar {
    /// 数值视图（文本 → 0）
    pub fn as_decimal(&self) -> f64 {
        match self {
            Scalar::Integer(i) => *i as f64,
            Scalar::Decimal(d) => *d,
            Scalar::Text(_) => 0.0,
        }
    }

    /// 文本视图（数值按 coerce_text 的规则输出）
    pub fn into_text(self) -> Option<String> {
        match self {
            Scalar::Text(t) => t,
            Scalar::Integer(i) => Some(i.to_string()),
            Scalar::Decimal(d) => Some(format_number(d)),
        }
    }
}

/// 按目标类型转换单元格
pub fn coerce(cell: &Cell, kind: ScalarKind) -> Coerced<Scalar> {
    match kind {
        ScalarKind::Integer => {
            let c = coerce_integer(cell);
            Coerced {
                value: Scalar::Integer(c.value),
                origin: c.origin,
            }
        }
        ScalarKind::Decimal => {
            let c = coerce_decimal(cell);
            Coerced {
                value: Scalar::Decimal(c.value),
                origin: c.origin,
            }
        }
        ScalarKind::Text => {
            let text = coerce_text(cell);
            let origin = if text.is_some() {
                CoercionOrigin::Parsed
            } else {
                CoercionOrigin::Blank
            };
            Coerced {
                value: Scalar::Text(text),
                origin,
            }
        }
    }
}

// ==========================================
// 文本
// ==========================================

/// 单元格 → 文本（TRIM；空白 → None）
///
/// 整数值的数值单元格不带小数部分输出（条码常以数值存储）
pub fn coerce_text(cell: &Cell) -> Option<String> {
    let text = match cell {
        Cell::Empty | Cell::Error(_) => return None,
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => format_number(*n),
        Cell::Date(serial) => match serial_to_date(*serial) {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => format_number(*serial),
        },
        Cell::Bool(b) => b.to_string().to_uppercase(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ==========================================
// 数值
// ==========================================

/// 单元格 → 小数（失败 → 0，来源为 Fallback）
fn coerce_decimal(cell: &Cell) -> Coerced<f64> {
    match cell {
        Cell::Empty => Coerced::blank(0.0),
        Cell::Number(n) | Cell::Date(n) => {
            if n.is_finite() {
                Coerced::parsed(*n)
            } else {
                Coerced::fallback(0.0)
            }
        }
        Cell::Text(s) if s.trim().is_empty() => Coerced::blank(0.0),
        Cell::Text(s) => match parse_locale_number(s) {
            Some(v) => Coerced::parsed(v),
            None => {
                debug!(raw = %s, "数值解析失败，按 0 处理");
                Coerced::fallback(0.0)
            }
        },
        Cell::Bool(b) => {
            debug!(raw = b, "布尔单元格用作数值，按 0 处理");
            Coerced::fallback(0.0)
        }
        Cell::Error(e) => {
            debug!(raw = %e, "错误单元格用作数值，按 0 处理");
            Coerced::fallback(0.0)
        }
    }
}

/// 单元格 → 整数（小数部分截断）
fn coerce_integer(cell: &Cell) -> Coerced<i64> {
    let c = coerce_decimal(cell);
    Coerced {
        value: c.value.trunc() as i64,
        origin: c.origin,
    }
}

/// 区域容错的数值解析
///
/// # 规则
/// - 去除货币符号、空格、字母等非数字字符
/// - 同时出现 `,` 和 `.`：最后出现的一个为小数点，另一个为千分位
/// - 只有 `,`：出现一次为小数点，多次为千分位
/// - 只有 `.`：出现多次为千分位
/// - 前导 `-` 表示负数
///
/// # 示例
/// - "1.234,56" → 1234.56
/// - "$ 1,234.56" → 1234.56
/// - "12,5" → 12.5
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let negative = trimmed.starts_with('-')
        || trimmed
            .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-')
            .starts_with('-');

    let kept: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_comma = kept.rfind(',');
    let last_dot = kept.rfind('.');
    let commas = kept.matches(',').count();
    let dots = kept.matches('.').count();

    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            if c > d {
                kept.replace('.', "").replace(',', ".")
            } else {
                kept.replace(',', "")
            }
        }
        (Some(_), None) => {
            if commas == 1 {
                kept.replace(',', ".")
            } else {
                kept.replace(',', "")
            }
        }
        (None, Some(_)) => {
            if dots == 1 {
                kept
            } else {
                kept.replace('.', "")
            }
        }
        (None, None) => kept,
    };

    // 两种分隔符混用且小数点不止一个，视为无法解析
    if normalized.matches('.').count() > 1 {
        return None;
    }

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

// ==========================================
// 日期
// ==========================================

/// 文本日期的尝试顺序：欧式日在前 → ISO → 美式月在前 → 英文月份缩写
const DATE_PATTERNS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
];

/// 文本日期可接受的年份范围（两位年份如 "24" 会被 %Y 解析为公元 24 年）
const TEXT_YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=9999;

/// 表格序列号 → 日期（1900 纪元，序列 0 = 1899-12-30）
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// 文本 → 日期（截取到第一个空格或 `T`，按固定顺序尝试）
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let head = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or("")
        .trim();
    if head.is_empty() {
        return None;
    }

    for pattern in DATE_PATTERNS {
        if let Ok(d) = NaiveDate::parse_from_str(head, pattern) {
            if TEXT_YEAR_RANGE.contains(&d.year()) {
                return Some(d);
            }
        }
    }

    // 以文本存储的序列号（如 "45301"）
    if head.len() == 5 && head.chars().all(|c| c.is_ascii_digit()) {
        return head.parse::<f64>().ok().and_then(serial_to_date);
    }

    None
}

/// 单元格 → 日期（无法识别 → None）
pub fn coerce_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(serial) | Cell::Number(serial) => serial_to_date(*serial),
        Cell::Text(s) => {
            let parsed = parse_date_text(s);
            if parsed.is_none() && !s.trim().is_empty() {
                debug!(raw = %s, "日期文本无法识别");
            }
            parsed
        }
        Cell::Empty | Cell::Bool(_) | Cell::Error(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_locale_numbers() {
        assert_eq!(parse_locale_number("12,5"), Some(12.5));
        assert_eq!(parse_locale_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_locale_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_locale_number("$ 1,234.56"), Some(1234.56));
        assert_eq!(parse_locale_number("1,234,567"), Some(1234567.0));
        assert_eq!(parse_locale_number("1.234.567"), Some(1234567.0));
        assert_eq!(parse_locale_number("-3,5"), Some(-3.5));
        assert_eq!(parse_locale_number("USD -7"), Some(-7.0));
        assert_eq!(parse_locale_number("n/a"), None);
        assert_eq!(parse_locale_number(""), None);
    }

    #[test]
    fn test_decimal_origin_is_observable() {
        let zero_by_value = coerce_decimal(&Cell::Number(0.0));
        let zero_by_default = coerce_decimal(&Cell::Text("abc".to_string()));
        let blank = coerce_decimal(&Cell::Text("  ".to_string()));

        assert_eq!(zero_by_value.value, 0.0);
        assert_eq!(zero_by_value.origin, CoercionOrigin::Parsed);
        assert_eq!(zero_by_default.value, 0.0);
        assert!(zero_by_default.is_fallback());
        assert_eq!(blank.origin, CoercionOrigin::Blank);
    }

    #[test]
    fn test_integer_truncates() {
        assert_eq!(coerce_integer(&Cell::Text("7,9".to_string())).value, 7);
        assert_eq!(coerce_integer(&Cell::Number(-2.5)).value, -2);
    }

    #[test]
    fn test_text_from_numeric_barcode() {
        assert_eq!(
            coerce_text(&Cell::Number(7861234567890.0)).as_deref(),
            Some("7861234567890")
        );
        assert_eq!(coerce_text(&Cell::Number(1.5)).as_deref(), Some("1.5"));
        assert_eq!(coerce_text(&Cell::Text("  CB1 ".to_string())).as_deref(), Some("CB1"));
        assert_eq!(coerce_text(&Cell::Empty), None);
        assert_eq!(
            coerce(&Cell::Text(" ".to_string()), ScalarKind::Text).value,
            Scalar::Text(None)
        );
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(serial_to_date(45301.0), Some(ymd(2024, 1, 10)));
        assert_eq!(serial_to_date(45301.75), Some(ymd(2024, 1, 10)));
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(coerce_date(&Cell::Date(45301.0)), Some(ymd(2024, 1, 10)));
        assert_eq!(coerce_date(&Cell::Number(45302.0)), Some(ymd(2024, 1, 11)));
    }

    #[test]
    fn test_text_dates_day_first_preferred() {
        assert_eq!(parse_date_text("05/01/2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date_text("5/1/2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date_text("10-01-2024"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse_date_text("10.01.2024"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse_date_text("2024-01-10"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse_date_text("2024-01-10T00:00:00"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse_date_text("2024/01/10 08:30"), Some(ymd(2024, 1, 10)));
        // 日 > 12 时只能按月在前解析
        assert_eq!(parse_date_text("01/25/2024"), Some(ymd(2024, 1, 25)));
        assert_eq!(parse_date_text("10-Jan-2024"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse_date_text("45301"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse_date_text("mañana"), None);
        assert_eq!(coerce_date(&Cell::Empty), None);
    }

    #[test]
    fn test_two_digit_years_are_rejected() {
        assert_eq!(parse_date_text("10/01/24"), None);
        assert_eq!(parse_date_text("24-01-10"), None);
        assert_eq!(parse_date_text("10.01.0024"), None);
        assert_eq!(coerce_date(&Cell::Text("10/01/24".to_string())), None);
        assert_eq!(parse_date_text("10/01/1900"), Some(ymd(1900, 1, 10)));
    }

    #[test]
    fn test_scalar_views() {
        let units = coerce(&Cell::Text("1.234,5".to_string()), ScalarKind::Decimal);
        assert_eq!(units.value.as_decimal(), 1234.5);
        assert_eq!(units.origin, CoercionOrigin::Parsed);

        let count = coerce(&Cell::Number(7.9), ScalarKind::Integer);
        assert_eq!(count.value, Scalar::Integer(7));
        assert_eq!(count.value.as_decimal(), 7.0);

        let code = coerce(&Cell::Number(7861234567890.0), ScalarKind::Text);
        assert_eq!(code.value.into_text().as_deref(), Some("7861234567890"));
        assert!(coerce(&Cell::Bool(true), ScalarKind::Decimal).is_fallback());
    }
}
