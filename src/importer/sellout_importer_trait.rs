// ==========================================
// Sell-out 台账系统 - Sell-out 导入 Trait
// ==========================================
// 职责: 定义单文件导入接口（不包含实现）
// ==========================================

use crate::domain::IngestionResult;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// SellOutImporter Trait
// ==========================================
// 用途: 上传文件 → 台账对账 → 运行汇总
// 实现者: SellOutImporterImpl
#[async_trait]
pub trait SellOutImporter: Send + Sync {
    /// 导入一个上传文件
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - file_name: 原始文件名（决定解析格式）
    /// - client_code: 客户业务编码；None/空白 → 配置的默认客户
    ///
    /// # 返回
    /// - Ok(IngestionResult): 运行汇总（致命错误也以 GENERAL 事件体现在汇总中）
    /// - Err: 空文件 / 格式不支持 / 配置读取失败
    ///
    /// # 导入流程
    /// 1. 读取配置、解析客户
    /// 2. 解析工作簿，定位工作表与表头
    /// 3. 预扫描收集候选条码
    /// 4. 目录批量解析
    /// 5. 主处理：逐行分类 → 对账引擎分批落库
    /// 6. 汇总
    async fn ingest(
        &self,
        bytes: &[u8],
        file_name: &str,
        client_code: Option<&str>,
    ) -> ImportResult<IngestionResult>;
}
