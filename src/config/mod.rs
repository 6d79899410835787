// ==========================================
// Maestro SKU 整合工具 - 配置层
// ==========================================
// 职责: 声明式整合配置（角色、文件名规则、表头行、字段映射）
// 存储: JSON 文件（可选），缺省使用内置配置
// ==========================================

pub mod profile;
pub mod profile_loader;

// 重导出核心配置类型
pub use profile::{
    ConsolidationProfile, FilenameRule, IdentifierRule, MasterConfig, RoleConfig, RoleVersion,
    OUTPUT_FILE_NAME, OUTPUT_MIME_TYPE,
};
pub use profile_loader::{default_profile_path, load_or_default, load_profile, validate_profile};
