// ==========================================
// Maestro SKU 整合工具 - API 层错误类型
// ==========================================
// 职责: 定义 API 层错误类型，将整合错误转换为面向操作员的本地化消息
// 要求: 每条消息须指明文件/角色/列，并列出可选项
// ==========================================

use crate::i18n::{t, t_with_args};
use crate::importer::error::ConsolidationError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 整合错误（分类 / 读表 / 列定位）
    // ==========================================
    #[error("整合失败: {0}")]
    ConsolidationFailed(ConsolidationError),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 输出与配置错误
    // ==========================================
    #[error("输出生成失败: {0}")]
    OutputError(String),

    #[error("配置错误 ({path}): {reason}")]
    ConfigError { path: String, reason: String },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 ConsolidationError 转换
// ==========================================
impl From<ConsolidationError> for ApiError {
    fn from(err: ConsolidationError) -> Self {
        match err {
            ConsolidationError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            ConsolidationError::OutputWriteError(msg) => ApiError::OutputError(msg),
            ConsolidationError::ProfileError { path, reason } => {
                ApiError::ConfigError { path, reason }
            }
            other => ApiError::ConsolidationFailed(other),
        }
    }
}

impl ApiError {
    /// 错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ConsolidationFailed(err) => err.code(),
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::OutputError(_) => "OUTPUT_WRITE_ERROR",
            ApiError::ConfigError { .. } => "PROFILE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// 面向操作员的本地化消息（当前 locale）
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidInput(reason) => {
                t_with_args("error.invalid_input", &[("reason", reason)])
            }
            ApiError::ConsolidationFailed(err) => consolidation_message(err),
            ApiError::InvalidStateTransition { from, to } => t_with_args(
                "error.invalid_state_transition",
                &[("from", from), ("to", to)],
            ),
            ApiError::OutputError(reason) => {
                t_with_args("error.output_write", &[("reason", reason)])
            }
            ApiError::ConfigError { path, reason } => {
                t_with_args("error.profile", &[("path", path), ("reason", reason)])
            }
            ApiError::InternalError(reason) => {
                t_with_args("error.internal", &[("reason", reason)])
            }
            ApiError::Other(err) => t_with_args("error.internal", &[("reason", &err.to_string())]),
        }
    }
}

fn consolidation_message(err: &ConsolidationError) -> String {
    match err {
        ConsolidationError::IncompleteUpload {
            master_missing,
            sources_missing,
        } => {
            let missing = match (master_missing, sources_missing) {
                (true, true) => t("upload.master_and_sources"),
                (true, false) => t("upload.master"),
                _ => t("upload.sources"),
            };
            t_with_args("error.incomplete_upload", &[("missing", &missing)])
        }
        ConsolidationError::UnreadableWorkbook { file, reason } => t_with_args(
            "error.unreadable_workbook",
            &[("file", file), ("reason", reason)],
        ),
        ConsolidationError::SheetNotFound {
            file,
            requested,
            available,
        } => t_with_args(
            "error.sheet_not_found",
            &[
                ("file", file),
                ("requested", requested),
                ("available", &available.join(", ")),
            ],
        ),
        ConsolidationError::IdentifierColumnNotFound { file, available } => t_with_args(
            "error.identifier_column_not_found",
            &[("file", file), ("available", &available.join(", "))],
        ),
        ConsolidationError::ColumnNotFound {
            file,
            role,
            column,
            available,
        } => t_with_args(
            "error.column_not_found",
            &[
                ("file", file),
                ("role", role.as_str()),
                ("column", column),
                ("available", &available.join(", ")),
            ],
        ),
        ConsolidationError::AmbiguousColumn {
            file,
            role,
            column,
            candidates,
        } => t_with_args(
            "error.ambiguous_column",
            &[
                ("file", file),
                ("role", role.as_str()),
                ("column", column),
                ("candidates", &candidates.join(", ")),
            ],
        ),
        ConsolidationError::MissingSource { role, accepted } => {
            let accepted: Vec<&str> = accepted.iter().map(|r| r.as_str()).collect();
            t_with_args(
                "error.missing_source",
                &[("role", role.as_str()), ("accepted", &accepted.join(", "))],
            )
        }
        ConsolidationError::AmbiguousSource { role, files } => t_with_args(
            "error.ambiguous_source",
            &[("role", role.as_str()), ("files", &files.join(", "))],
        ),
        ConsolidationError::InvalidStateTransition { from, to } => t_with_args(
            "error.invalid_state_transition",
            &[("from", from), ("to", to)],
        ),
        ConsolidationError::OutputWriteError(reason) => {
            t_with_args("error.output_write", &[("reason", reason)])
        }
        ConsolidationError::ProfileError { path, reason } => {
            t_with_args("error.profile", &[("path", path), ("reason", reason)])
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
