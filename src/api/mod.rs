// ==========================================
// Maestro SKU 整合工具 - API 层
// ==========================================
// 职责: 请求/响应门面，供命令行或外部上传界面调用
// ==========================================

pub mod consolidation_api;
pub mod error;

// 重导出核心类型
pub use consolidation_api::{
    ConsolidationApi, ConsolidationReport, ConsolidationResponse, DEFAULT_PREVIEW_ROWS,
};
pub use error::{ApiError, ApiResult};
