// ==========================================
// Maestro SKU 整合工具 - 整合层
// ==========================================
// 职责: 主表 + Product Cloud 导出 → 按 SKU 整合的单表
// 流程: 解析 → 列名标准化 → 分类 → SKU 定位 → 连接 → 输出
// 支持: xlsx / xlsm / xls / xlsb / ods
// ==========================================

// 模块声明
pub mod column_normalizer;
pub mod consolidation_trait;
pub mod error;
pub mod field_resolver;
pub mod identifier;
pub mod pipeline;
pub mod source_classifier;
pub mod workbook_reader;
pub mod workbook_writer;

// 重导出核心类型
pub use column_normalizer::DefaultColumnNormalizer;
pub use error::{ConsolidationError, ConsolidationResult};
pub use field_resolver::{
    column_matches, resolve_column, FieldResolver, LookupIndex, MappingPlan, ResolvedField,
    RoleTable, RoleTables,
};
pub use identifier::{extract_identifiers, find_identifier_column, BaseIdentifiers};
pub use pipeline::{ConsolidationPipeline, ConsolidationRequest, PipelineStage, Upload};
pub use source_classifier::FilenameClassifier;
pub use workbook_reader::{CalamineWorkbookReader, RawSheet};
pub use workbook_writer::write_workbook;

// 重导出 Trait 接口
pub use consolidation_trait::{Classification, ColumnNormalizer, SourceClassifier, WorkbookParser};
