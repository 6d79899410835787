// ==========================================
// Maestro SKU 整合工具 - 核心库
// ==========================================
// 职责: 主表（Maestro）+ Product Cloud 导出 → 按 SKU 整合的单表
// 技术栈: calamine（读取）+ rust_xlsxwriter（输出）
// 定位: 单次请求、全内存、无持久化
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 表、映射、整合结果
pub mod domain;

// 整合层 - 解析 / 分类 / 连接 / 输出
pub mod importer;

// 配置层 - 整合配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 请求/响应门面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CellValue, ColumnSpec, ConsolidatedTable, ConsolidationOutput, FieldMapping, HeaderRow,
    SheetSelector, SourceRole, Table,
};

// 配置
pub use config::ConsolidationProfile;

// 整合流程
pub use importer::{
    ConsolidationError, ConsolidationPipeline, ConsolidationRequest, ConsolidationResult, Upload,
};

// API
pub use api::{ApiError, ConsolidationApi, ConsolidationResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Maestro SKU 整合工具";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
