// ==========================================
// Maestro SKU 整合工具 - 整合模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 要求: 每条错误信息需指明文件/角色/列，并列出可选项
// ==========================================

use crate::domain::types::SourceRole;
use thiserror::Error;

/// 整合模块错误类型（均为致命错误；单元格警告见 CellTransformWarning）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsolidationError {
    // ===== 输入相关错误 =====
    #[error("上传不完整: 缺少{}", missing_upload_label(.master_missing, .sources_missing))]
    IncompleteUpload {
        master_missing: bool,
        sources_missing: bool,
    },

    #[error("无法读取工作簿 {file}: {reason}")]
    UnreadableWorkbook { file: String, reason: String },

    #[error("工作簿 {file} 中未找到工作表 {requested}（可用: {}）", .available.join(", "))]
    SheetNotFound {
        file: String,
        requested: String,
        available: Vec<String>,
    },

    // ===== 列定位错误 =====
    #[error("主表 {file} 中未找到 SKU 列（可用列: {}）", .available.join(", "))]
    IdentifierColumnNotFound { file: String, available: Vec<String> },

    #[error("文件 {file}（{role}）中未找到列 {column}（可用列: {}）", .available.join(", "))]
    ColumnNotFound {
        file: String,
        role: SourceRole,
        column: String,
        available: Vec<String>,
    },

    #[error("文件 {file}（{role}）中列 {column} 匹配到多个列: {}", .candidates.join(", "))]
    AmbiguousColumn {
        file: String,
        role: SourceRole,
        column: String,
        candidates: Vec<String>,
    },

    // ===== 数据源分类错误 =====
    #[error("缺少数据源 {role}（可接受: {}）", join_roles(.accepted))]
    MissingSource {
        role: SourceRole,
        accepted: Vec<SourceRole>,
    },

    #[error("数据源 {role} 匹配到多个文件: {}", .files.join(", "))]
    AmbiguousSource { role: SourceRole, files: Vec<String> },

    // ===== 流程错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("输出工作簿生成失败: {0}")]
    OutputWriteError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 ({path}): {reason}")]
    ProfileError { path: String, reason: String },
}

impl ConsolidationError {
    /// 错误代码（供日志/前端归类）
    pub fn code(&self) -> &'static str {
        match self {
            ConsolidationError::IncompleteUpload { .. } => "INCOMPLETE_UPLOAD",
            ConsolidationError::UnreadableWorkbook { .. } => "UNREADABLE_WORKBOOK",
            ConsolidationError::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            ConsolidationError::IdentifierColumnNotFound { .. } => "IDENTIFIER_COLUMN_NOT_FOUND",
            ConsolidationError::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            ConsolidationError::AmbiguousColumn { .. } => "AMBIGUOUS_COLUMN",
            ConsolidationError::MissingSource { .. } => "MISSING_SOURCE",
            ConsolidationError::AmbiguousSource { .. } => "AMBIGUOUS_SOURCE",
            ConsolidationError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ConsolidationError::OutputWriteError(_) => "OUTPUT_WRITE_ERROR",
            ConsolidationError::ProfileError { .. } => "PROFILE_ERROR",
        }
    }
}

fn missing_upload_label(master_missing: &bool, sources_missing: &bool) -> &'static str {
    match (*master_missing, *sources_missing) {
        (true, true) => "主表与源文件",
        (true, false) => "主表",
        _ => "源文件",
    }
}

fn join_roles(roles: &[SourceRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// 实现 From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ConsolidationError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ConsolidationError::OutputWriteError(err.to_string())
    }
}

/// Result 类型别名
pub type ConsolidationResult<T> = Result<T, ConsolidationError>;
