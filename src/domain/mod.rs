// ==========================================
// Maestro SKU 整合工具 - 领域模型层
// ==========================================
// 职责: 定义表格、角色、映射规则、整合结果
// 红线: 不含解析逻辑,不含合并逻辑
// ==========================================

pub mod consolidation;
pub mod mapping;
pub mod table;
pub mod types;

// 重导出核心类型
pub use consolidation::{
    CellTransformWarning, ConsolidatedRecord, ConsolidatedTable, ConsolidationOutput, Diagnostic,
    DiagnosticKind, DiagnosticLevel, RunSummary,
};
pub use mapping::{ColumnSpec, FieldMapping, FieldSource, ValueTransform};
pub use table::{CellValue, Table};
pub use types::{HeaderRow, SheetSelector, SourceRole};
