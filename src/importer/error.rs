// ==========================================
// Sell-out 台账系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级问题不走错误类型，而是记入事件日志；
//       这里只描述会终止工作表或整次运行的错误
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件为空: {0}")]
    EmptyFile(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 业务前置条件 =====
    #[error("客户不存在: {0}")]
    ClientNotFound(String),

    // ===== 数据库错误 =====
    #[error("数据库写入失败: {0}")]
    StorageError(String),

    #[error("目录查询失败: {0}")]
    CatalogLookupError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigReadError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::StorageError(err.to_string())
    }
}

impl ImportError {
    /// 致命事件的对外描述
    pub fn fatal_detail(&self) -> String {
        match self {
            ImportError::ClientNotFound(code) => format!("Cliente no encontrado: {}", code),
            ImportError::FileReadError(d)
            | ImportError::ExcelParseError(d)
            | ImportError::CsvParseError(d) => format!("No se pudo leer el archivo: {}", d),
            ImportError::StorageError(d) => format!("Error de base de datos: {}", d),
            ImportError::CatalogLookupError(d) => format!("Error consultando catálogo: {}", d),
            other => other.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
