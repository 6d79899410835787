// ==========================================
// Maestro SKU 整合工具 - 整合结果领域模型
// ==========================================
// 职责: 整合记录、结果表、单元格警告、诊断信息、运行汇总
// ==========================================

use crate::domain::table::CellValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ConsolidatedRecord - 整合记录（一行一个 SKU）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    pub identifier: CellValue,   // 主表 SKU
    pub values: Vec<CellValue>,  // 与映射规则一一对应，各自可为空
}

// ==========================================
// ConsolidatedTable - 整合结果表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedTable {
    /// 输出列名（第一列为 SKU 列）
    pub columns: Vec<String>,
    pub records: Vec<ConsolidatedRecord>,
}

impl ConsolidatedTable {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// 预览前 n 行
    pub fn preview(&self, n: usize) -> &[ConsolidatedRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// 按输出列名取整列（SKU 列或任一映射列）
    pub fn column(&self, name: &str) -> Option<Vec<CellValue>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.records
                .iter()
                .map(|r| {
                    if idx == 0 {
                        r.identifier.clone()
                    } else {
                        r.values.get(idx - 1).cloned().unwrap_or_default()
                    }
                })
                .collect(),
        )
    }
}

// ==========================================
// CellTransformWarning - 单元格变换警告（非致命）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTransformWarning {
    pub identifier: String,  // 受影响 SKU
    pub destination: String, // 输出列
    pub value: String,       // 无法变换的原值
    pub message: String,
}

// ==========================================
// Diagnostic - 运行诊断
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Warning, // 需人工关注
    Info,    // 仅记录
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    UnclassifiedFile,      // 文件名未匹配任何角色
    OverlappingRules,      // 文件名匹配多个角色规则（取第一个）
    IgnoredSource,         // 角色未被任何映射使用
    DuplicateKeys,         // 源表键列存在重复值（保留最后一条）
    BlankIdentifiers,      // 主表 SKU 为空的行已跳过
    OptionalColumnMissing, // 可选值列缺失，整列置空
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub file: Option<String>,
    pub message: String,
    /// 涉及的行或键数量（重复键、空 SKU）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            kind,
            file: file.map(str::to_string),
            message: message.into(),
            count: None,
        }
    }

    pub fn info(kind: DiagnosticKind, file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            kind,
            file: file.map(str::to_string),
            message: message.into(),
            count: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

// ==========================================
// RunSummary - 运行汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,             // 运行 ID（UUID）
    pub started_at: DateTime<Utc>,  // 开始时间
    pub master_file: String,        // 主表文件名
    pub source_files: Vec<String>,  // 已使用的源文件
    pub total_rows: usize,          // 输出行数
    pub matched_cells: usize,       // 查找命中的单元格数
    pub warning_count: usize,       // 单元格警告数
}

// ==========================================
// ConsolidationOutput - 整合结果（Ready 状态）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationOutput {
    pub table: ConsolidatedTable,
    pub warnings: Vec<CellTransformWarning>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: RunSummary,
    pub elapsed_time: std::time::Duration, // 整合耗时
}
