// ==========================================
// 整合 API
// ==========================================
// 职责: 一次请求 → 一次整合 → 可下载的工作簿 + 报告
// 状态: 无跨请求状态，每次调用新建流程
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConsolidationProfile, OUTPUT_FILE_NAME, OUTPUT_MIME_TYPE};
use crate::domain::consolidation::{
    CellTransformWarning, ConsolidatedRecord, ConsolidationOutput, Diagnostic, RunSummary,
};
use crate::importer::{write_workbook, ConsolidationPipeline, ConsolidationRequest};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// 预览默认行数
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// 整合 API 响应
#[derive(Debug, Clone)]
pub struct ConsolidationResponse {
    /// 下载文件名
    pub file_name: String,
    /// 下载 MIME 类型
    pub mime_type: String,
    /// 输出工作簿字节
    pub bytes: Vec<u8>,
    /// 整合结果（表、警告、诊断、汇总）
    pub output: ConsolidationOutput,
}

impl ConsolidationResponse {
    /// 预览前 n 行
    pub fn preview(&self, n: usize) -> &[ConsolidatedRecord] {
        self.output.table.preview(n)
    }

    /// 生成运行报告
    pub fn report(&self, preview_rows: usize) -> ConsolidationReport {
        ConsolidationReport {
            file_name: self.file_name.clone(),
            summary: self.output.summary.clone(),
            elapsed_ms: self.output.elapsed_time.as_millis() as u64,
            columns: self.output.table.columns.clone(),
            preview: self.preview(preview_rows).to_vec(),
            warnings: self.output.warnings.clone(),
            diagnostics: self.output.diagnostics.clone(),
        }
    }
}

/// 运行报告（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub file_name: String,
    pub summary: RunSummary,
    /// 整合耗时（毫秒）
    pub elapsed_ms: u64,
    pub columns: Vec<String>,
    pub preview: Vec<ConsolidatedRecord>,
    pub warnings: Vec<CellTransformWarning>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConsolidationReport {
    pub fn to_json(&self) -> ApiResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ApiError::InternalError(format!("报告序列化失败: {}", e)))
    }
}

// ==========================================
// ConsolidationApi
// ==========================================
pub struct ConsolidationApi {
    profile: ConsolidationProfile,
}

impl ConsolidationApi {
    pub fn new(profile: ConsolidationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ConsolidationProfile {
        &self.profile
    }

    /// 执行一次整合
    ///
    /// # 参数
    /// - request: 主表、源文件与本次覆盖项
    ///
    /// # 返回
    /// - Ok(ConsolidationResponse): 输出工作簿与结果
    /// - Err(ApiError): 输入无效或整合失败
    #[instrument(skip(self, request), fields(profile = %self.profile.name))]
    pub fn consolidate(&self, request: ConsolidationRequest) -> ApiResult<ConsolidationResponse> {
        validate_request(&request)?;

        let mut pipeline = ConsolidationPipeline::from_request(self.profile.clone(), request);
        pipeline.run()?;
        let output = pipeline
            .into_output()
            .ok_or_else(|| ApiError::InternalError("整合结果缺失".to_string()))?;

        let bytes = write_workbook(&output.table, &self.profile.output_sheet)?;
        info!(
            run_id = %output.summary.run_id,
            rows = output.summary.total_rows,
            bytes = bytes.len(),
            "整合请求完成"
        );

        Ok(ConsolidationResponse {
            file_name: OUTPUT_FILE_NAME.to_string(),
            mime_type: OUTPUT_MIME_TYPE.to_string(),
            bytes,
            output,
        })
    }
}

/// 请求校验（文件名不能为空）
fn validate_request(request: &ConsolidationRequest) -> ApiResult<()> {
    let blank_name = request
        .master
        .iter()
        .chain(request.sources.iter())
        .any(|upload| upload.file_name.trim().is_empty());
    if blank_name {
        return Err(ApiError::InvalidInput("上传文件缺少文件名".to_string()));
    }
    Ok(())
}
