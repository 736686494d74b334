// ==========================================
// Sell-out 台账系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// IngestConfigReader Trait
// ==========================================
// 用途: 导入流水线所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait IngestConfigReader: Send + Sync {
    /// 获取对账写入批大小（每批一个事务）
    ///
    /// # 默认值
    /// - 5000
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error>>;

    /// 获取表头扫描深度（从工作表顶部起最多扫描的行数）
    ///
    /// # 默认值
    /// - 30
    async fn get_header_scan_depth(&self) -> Result<usize, Box<dyn Error>>;

    /// 获取目录批量查询的分块大小
    ///
    /// # 默认值
    /// - 900（上限同为 900，受 SQLite 绑定参数数量限制）
    async fn get_lookup_chunk_size(&self) -> Result<usize, Box<dyn Error>>;

    /// 获取单次运行内单编码查询缓存的容量
    ///
    /// # 默认值
    /// - 1024
    async fn get_memo_capacity(&self) -> Result<usize, Box<dyn Error>>;

    /// 获取默认客户编码（上传未指定客户时使用）
    ///
    /// # 默认值
    /// - MZCL-000008
    async fn get_default_client_code(&self) -> Result<String, Box<dyn Error>>;
}

// ==========================================
// IngestSettings - 单次运行的配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub header_scan_depth: usize,
    pub lookup_chunk_size: usize,
    pub memo_capacity: usize,
    pub default_client_code: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            header_scan_depth: 30,
            lookup_chunk_size: 900,
            memo_capacity: 1024,
            default_client_code: crate::domain::DEFAULT_CLIENT_CODE.to_string(),
        }
    }
}

impl IngestSettings {
    /// 一次性读取全部导入配置
    pub async fn load<C: IngestConfigReader + ?Sized>(config: &C) -> Result<Self, Box<dyn Error>> {
        // 逐条 await：错误值不能跨越下一次 await 存活（Box<dyn Error> 非 Send）
        let batch_size = config.get_batch_size().await?;
        let header_scan_depth = config.get_header_scan_depth().await?;
        let lookup_chunk_size = config.get_lookup_chunk_size().await?;
        let memo_capacity = config.get_memo_capacity().await?;
        let default_client_code = config.get_default_client_code().await?;

        Ok(Self {
            batch_size,
            header_scan_depth,
            lookup_chunk_size,
            memo_capacity,
            default_client_code,
        })
    }
}
