// ==========================================
// Sell-out 台账系统 - 上传导入API
// ==========================================
// 职责: 封装单文件导入，返回运行汇总或纯文本事件报告
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::open_sqlite_connection;
use crate::domain::IngestionResult;
use crate::importer::{
    render_text_report, report_file_name, FileFormat, PartnerLayout, SellOutImporter,
    SellOutImporterImpl,
};
use crate::repository::{CatalogRepository, ClientRepository, LedgerRepository};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 上传响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "camelCase")]
pub enum IngestResponse {
    /// 运行汇总（JSON）
    Summary(IngestionResult),
    /// 纯文本事件报告（附下载文件名）
    TextReport { file_name: String, content: String },
}

/// 导入API
pub struct IngestApi {
    db_path: String,
}

impl IngestApi {
    /// 创建新的 IngestApi 实例
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// 上传并导入一个 RM 格式的 sell-out 文件
    pub async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        client_code: Option<&str>,
        as_text: bool,
    ) -> ApiResult<IngestResponse> {
        self.upload_with_layout(bytes, file_name, client_code, as_text, PartnerLayout::rm())
            .await
    }

    /// 按指定伙伴布局上传并导入一个 sell-out 文件
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - file_name: 原始文件名
    /// - client_code: 客户编码（None/空白 → 布局专属客户或默认客户）
    /// - as_text: true 时返回纯文本报告
    /// - layout: 伙伴文件布局
    ///
    /// # 返回
    /// - Ok(IngestResponse): 运行汇总或文本报告
    /// - Err(ApiError::InvalidInput): 空文件 / 格式不支持
    pub async fn upload_with_layout(
        &self,
        bytes: &[u8],
        file_name: &str,
        client_code: Option<&str>,
        as_text: bool,
        layout: PartnerLayout,
    ) -> ApiResult<IngestResponse> {
        if bytes.is_empty() {
            return Err(ApiError::InvalidInput(format!("文件为空: {}", file_name)));
        }
        FileFormat::from_file_name(file_name)?;

        let importer = self.create_importer(layout)?;
        let result = importer.ingest(bytes, file_name, client_code).await?;

        info!(
            file_name = %file_name,
            partner = %result.partner,
            ok = result.ok,
            as_text = as_text,
            "上传导入完成"
        );

        if as_text {
            let now = Local::now().naive_local();
            Ok(IngestResponse::TextReport {
                file_name: report_file_name(&result.partner, now),
                content: render_text_report(&result, now),
            })
        } else {
            Ok(IngestResponse::Summary(result))
        }
    }

    /// 创建导入器（全部仓储共享一个连接）
    fn create_importer(
        &self,
        layout: PartnerLayout,
    ) -> ApiResult<SellOutImporterImpl<ConfigManager, CatalogRepository>> {
        let conn = open_sqlite_connection(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::InternalError(format!("创建配置管理器失败: {}", e)))?;
        if let Ok(snapshot) = config.get_config_snapshot() {
            debug!(config = %snapshot, "导入配置快照");
        }

        Ok(SellOutImporterImpl::with_layout(
            config,
            CatalogRepository::from_connection(conn.clone()),
            LedgerRepository::from_connection(conn.clone()),
            ClientRepository::from_connection(conn),
            layout,
        ))
    }
}
