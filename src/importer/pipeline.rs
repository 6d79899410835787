// ==========================================
// Maestro SKU 整合工具 - 整合流程（状态机）
// ==========================================
// 状态: AwaitingInputs → Validating → Joining → Ready
//       任一致命错误 → Failed(reason)
// 流程: 分类 → 读主表 → 定位 SKU → 读源表 → 列定位 → 连接 → 汇总
// 红线: 单次请求内全部在内存完成，不跨请求共享状态
// ==========================================

use crate::config::ConsolidationProfile;
use crate::domain::consolidation::{
    ConsolidatedRecord, ConsolidatedTable, ConsolidationOutput, Diagnostic, DiagnosticKind,
    RunSummary,
};
use crate::domain::table::{CellValue, Table};
use crate::domain::types::{HeaderRow, SourceRole};
use crate::i18n::{t, t_with_args};
use crate::importer::column_normalizer::DefaultColumnNormalizer;
use crate::importer::consolidation_trait::{ColumnNormalizer, SourceClassifier, WorkbookParser};
use crate::importer::error::{ConsolidationError, ConsolidationResult};
use crate::importer::field_resolver::{
    column_matches, FieldResolver, MappingPlan, RoleTable, RoleTables,
};
use crate::importer::identifier::{extract_identifiers, find_identifier_column};
use crate::importer::source_classifier::FilenameClassifier;
use crate::importer::workbook_reader::{CalamineWorkbookReader, RawSheet};
use crate::importer::workbook_writer::write_workbook;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 输入对象
// ==========================================

/// 上传文件（文件名 + 原始字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// 整合请求（一次调用的全部输入与覆盖项）
#[derive(Debug, Clone, Default)]
pub struct ConsolidationRequest {
    pub master: Option<Upload>,
    pub sources: Vec<Upload>,
    /// 覆盖主表表头行
    pub master_header_row: Option<HeaderRow>,
    /// 按角色覆盖表头行
    pub header_rows: HashMap<SourceRole, HeaderRow>,
    /// 声明的导出版本（选择配置中的版本覆盖项）
    pub export_version: Option<String>,
}

// ==========================================
// 流程阶段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    AwaitingInputs,
    Validating,
    Joining,
    Ready,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::AwaitingInputs => "AwaitingInputs",
            PipelineStage::Validating => "Validating",
            PipelineStage::Joining => "Joining",
            PipelineStage::Ready => "Ready",
            PipelineStage::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// 校验通过的输入（Joining 阶段持有）
#[derive(Debug)]
struct ValidatedInputs {
    master_file: String,
    base_ids: Vec<CellValue>,
    role_tables: RoleTables,
    plans: Vec<(String, MappingPlan)>,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
enum PipelineState {
    AwaitingInputs,
    // Validating 只存在于 validate() 调用期间
    Joining(Box<ValidatedInputs>),
    Ready(Box<ConsolidationOutput>),
    Failed(ConsolidationError),
}

// ==========================================
// ConsolidationPipeline - 整合流程
// ==========================================
pub struct ConsolidationPipeline {
    profile: ConsolidationProfile,

    // 流程组件
    parser: Box<dyn WorkbookParser>,
    normalizer: Box<dyn ColumnNormalizer>,
    classifier: Box<dyn SourceClassifier>,

    request: ConsolidationRequest,
    state: PipelineState,

    run_id: String,
    started_at: DateTime<Utc>,
    started: Option<Instant>,
}

impl ConsolidationPipeline {
    /// 使用默认组件创建流程
    pub fn new(profile: ConsolidationProfile) -> Self {
        let classifier = FilenameClassifier::from_profile(&profile);
        Self::with_components(
            profile,
            Box::new(CalamineWorkbookReader),
            Box::new(DefaultColumnNormalizer),
            Box::new(classifier),
        )
    }

    /// 使用自定义组件创建流程
    ///
    /// # 参数
    /// - profile: 整合配置
    /// - parser: 工作簿解析器
    /// - normalizer: 列名标准化器
    /// - classifier: 数据源分类器
    pub fn with_components(
        profile: ConsolidationProfile,
        parser: Box<dyn WorkbookParser>,
        normalizer: Box<dyn ColumnNormalizer>,
        classifier: Box<dyn SourceClassifier>,
    ) -> Self {
        Self {
            profile,
            parser,
            normalizer,
            classifier,
            request: ConsolidationRequest::default(),
            state: PipelineState::AwaitingInputs,
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            started: None,
        }
    }

    /// 由完整请求创建流程（默认组件）
    pub fn from_request(profile: ConsolidationProfile, request: ConsolidationRequest) -> Self {
        let mut pipeline = Self::new(profile);
        pipeline.request = request;
        pipeline
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn profile(&self) -> &ConsolidationProfile {
        &self.profile
    }

    /// 当前阶段
    pub fn stage(&self) -> PipelineStage {
        match self.state {
            PipelineState::AwaitingInputs => PipelineStage::AwaitingInputs,
            PipelineState::Joining(_) => PipelineStage::Joining,
            PipelineState::Ready(_) => PipelineStage::Ready,
            PipelineState::Failed(_) => PipelineStage::Failed,
        }
    }

    /// 失败原因（仅 Failed 状态）
    pub fn failure(&self) -> Option<&ConsolidationError> {
        match &self.state {
            PipelineState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// 整合结果（仅 Ready 状态）
    pub fn output(&self) -> Option<&ConsolidationOutput> {
        match &self.state {
            PipelineState::Ready(output) => Some(output.as_ref()),
            _ => None,
        }
    }

    pub fn into_output(self) -> Option<ConsolidationOutput> {
        match self.state {
            PipelineState::Ready(output) => Some(*output),
            _ => None,
        }
    }

    // ==========================================
    // AwaitingInputs: 收集上传
    // ==========================================

    pub fn set_master(&mut self, upload: Upload) -> ConsolidationResult<()> {
        self.expect_stage(PipelineStage::AwaitingInputs, PipelineStage::AwaitingInputs)?;
        self.request.master = Some(upload);
        Ok(())
    }

    pub fn add_source(&mut self, upload: Upload) -> ConsolidationResult<()> {
        self.expect_stage(PipelineStage::AwaitingInputs, PipelineStage::AwaitingInputs)?;
        self.request.sources.push(upload);
        Ok(())
    }

    pub fn set_master_header_row(&mut self, header_row: HeaderRow) -> ConsolidationResult<()> {
        self.expect_stage(PipelineStage::AwaitingInputs, PipelineStage::AwaitingInputs)?;
        self.request.master_header_row = Some(header_row);
        Ok(())
    }

    pub fn set_header_row(
        &mut self,
        role: SourceRole,
        header_row: HeaderRow,
    ) -> ConsolidationResult<()> {
        self.expect_stage(PipelineStage::AwaitingInputs, PipelineStage::AwaitingInputs)?;
        self.request.header_rows.insert(role, header_row);
        Ok(())
    }

    pub fn set_export_version(&mut self, version: impl Into<String>) -> ConsolidationResult<()> {
        self.expect_stage(PipelineStage::AwaitingInputs, PipelineStage::AwaitingInputs)?;
        self.request.export_version = Some(version.into());
        Ok(())
    }

    fn expect_stage(&self, expected: PipelineStage, to: PipelineStage) -> ConsolidationResult<()> {
        let current = self.stage();
        if current == expected {
            Ok(())
        } else {
            Err(ConsolidationError::InvalidStateTransition {
                from: current.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn fail(&mut self, err: ConsolidationError) -> ConsolidationError {
        error!(run_id = %self.run_id, code = err.code(), error = %err, "整合失败");
        self.state = PipelineState::Failed(err.clone());
        err
    }

    // ==========================================
    // Validating
    // ==========================================

    /// 校验输入（分类、读表、定位列）
    ///
    /// # 返回
    /// - Ok(()): 进入 Joining
    /// - Err(IncompleteUpload): 上传不完整，保持 AwaitingInputs
    /// - Err(其他): 进入 Failed
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn validate(&mut self) -> ConsolidationResult<()> {
        self.expect_stage(PipelineStage::AwaitingInputs, PipelineStage::Validating)?;

        let master_missing = self.request.master.is_none();
        let sources_missing = self.request.sources.is_empty();
        if master_missing || sources_missing {
            warn!(master_missing, sources_missing, "上传不完整，暂不开始校验");
            return Err(ConsolidationError::IncompleteUpload {
                master_missing,
                sources_missing,
            });
        }

        self.started = Some(Instant::now());
        self.started_at = Utc::now();
        info!(
            profile = %self.profile.name,
            sources = self.request.sources.len(),
            "开始整合校验"
        );

        match self.validate_inputs() {
            Ok(validated) => {
                info!(
                    base_rows = validated.base_ids.len(),
                    roles = validated.role_tables.len(),
                    "校验完成"
                );
                self.state = PipelineState::Joining(Box::new(validated));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn validate_inputs(&self) -> ConsolidationResult<ValidatedInputs> {
        let mut diagnostics = Vec::new();

        // === 步骤 1: 数据源分类 ===
        debug!("步骤 1: 数据源分类");
        let selected = self.classify_sources(&mut diagnostics)?;

        // === 步骤 2: 读取主表并定位 SKU 列 ===
        debug!("步骤 2: 读取主表");
        let master = self
            .request
            .master
            .as_ref()
            .ok_or(ConsolidationError::IncompleteUpload {
                master_missing: true,
                sources_missing: false,
            })?;
        let base_ids = self.read_master(master, &mut diagnostics)?;

        // === 步骤 3: 读取源表 ===
        debug!("步骤 3: 读取源表");
        let mut role_tables = RoleTables::new();
        for (role, idx) in selected {
            let upload = &self.request.sources[idx];
            let role_table = self.read_source(role, upload)?;
            role_tables.insert(role, role_table);
        }

        // === 步骤 4: 列定位 ===
        debug!("步骤 4: 列定位");
        let mut plans = Vec::with_capacity(self.profile.mappings.len());
        for mapping in &self.profile.mappings {
            let plan = FieldResolver::plan(&role_tables, mapping)?;
            if let MappingPlan::Lookup {
                role,
                value_column: None,
                ..
            } = &plan
            {
                let file = role_tables.get(role).map(|t| t.file_name.as_str());
                warn!(destination = %mapping.destination, role = %role, "可选值列缺失，整列置空");
                diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::OptionalColumnMissing,
                    file,
                    t_with_args(
                        "diagnostic.optional_column_missing",
                        &[("destination", &mapping.destination)],
                    ),
                ));
            }
            plans.push((mapping.destination.clone(), plan));
        }

        Ok(ValidatedInputs {
            master_file: master.file_name.clone(),
            base_ids,
            role_tables,
            plans,
            diagnostics,
        })
    }

    /// 分类并选定每个角色链使用的文件
    ///
    /// # 返回
    /// - 角色 → 源文件下标（按映射中首次出现顺序）
    fn classify_sources(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ConsolidationResult<Vec<(SourceRole, usize)>> {
        let mut groups: BTreeMap<SourceRole, Vec<usize>> = BTreeMap::new();

        for (idx, upload) in self.request.sources.iter().enumerate() {
            let classification = self.classifier.classify(&upload.file_name);
            match classification.role {
                Some(role) => {
                    debug!(file = %upload.file_name, role = %role, "文件分类完成");
                    if !classification.also_matched.is_empty() {
                        let others: Vec<&str> =
                            classification.also_matched.iter().map(|r| r.as_str()).collect();
                        diagnostics.push(Diagnostic::info(
                            DiagnosticKind::OverlappingRules,
                            Some(upload.file_name.as_str()),
                            t_with_args(
                                "diagnostic.overlapping_rules",
                                &[("others", &others.join(", ")), ("role", role.as_str())],
                            ),
                        ));
                    }
                    groups.entry(role).or_default().push(idx);
                }
                None => {
                    warn!(file = %upload.file_name, "文件名未匹配任何数据源");
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UnclassifiedFile,
                        Some(upload.file_name.as_str()),
                        t("diagnostic.unclassified_file"),
                    ));
                }
            }
        }

        let files_of = |role: SourceRole| groups.get(&role).map(Vec::as_slice).unwrap_or(&[]);

        // 歧义检查先于缺失检查
        let required = self.profile.required_roles();
        for role in &required {
            let files = files_of(*role);
            if files.len() > 1 {
                return Err(ConsolidationError::AmbiguousSource {
                    role: *role,
                    files: files
                        .iter()
                        .map(|i| self.request.sources[*i].file_name.clone())
                        .collect(),
                });
            }
        }

        let mut selected: Vec<(SourceRole, usize)> = Vec::new();
        for mapping in &self.profile.mappings {
            let chain = mapping.roles();
            if chain.is_empty() {
                continue;
            }
            let chosen = chain
                .iter()
                .find_map(|role| files_of(*role).first().map(|idx| (*role, *idx)));
            match chosen {
                Some(choice) => {
                    if !selected.contains(&choice) {
                        selected.push(choice);
                    }
                }
                None => {
                    return Err(ConsolidationError::MissingSource {
                        role: chain[0],
                        accepted: chain.to_vec(),
                    })
                }
            }
        }

        for (role, indexes) in &groups {
            if selected.iter().any(|(r, _)| r == role) {
                continue;
            }
            for idx in indexes {
                let file_name = &self.request.sources[*idx].file_name;
                debug!(file = %file_name, role = %role, "数据源未被使用");
                diagnostics.push(Diagnostic::info(
                    DiagnosticKind::IgnoredSource,
                    Some(file_name.as_str()),
                    t_with_args("diagnostic.ignored_source", &[("role", role.as_str())]),
                ));
            }
        }

        Ok(selected)
    }

    fn read_master(
        &self,
        master: &Upload,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ConsolidationResult<Vec<CellValue>> {
        let raw = self
            .parser
            .read_sheet(&master.file_name, &master.bytes, &self.profile.master.sheet)?;

        let header_row = self
            .request
            .master_header_row
            .unwrap_or(self.profile.master.header_row);
        let identifier = &self.profile.identifier;
        let header = self.locate_header(&raw, header_row, |name| identifier.matches(name));

        let table = match header {
            Some(row) => self.normalizer.normalize(raw.into_table(row)),
            None => {
                return Err(ConsolidationError::IdentifierColumnNotFound {
                    file: master.file_name.clone(),
                    available: self.scanned_names(&raw, header_row),
                })
            }
        };

        let column = find_identifier_column(&table, |c| identifier.matches(c), &master.file_name)?;
        let ids = extract_identifiers(&table, column, self.profile.master.skip_blank_identifiers);

        if ids.skipped_blank > 0 {
            let count = ids.skipped_blank.to_string();
            diagnostics.push(
                Diagnostic::info(
                    DiagnosticKind::BlankIdentifiers,
                    Some(master.file_name.as_str()),
                    t_with_args("diagnostic.blank_identifiers", &[("count", &count)]),
                )
                .with_count(ids.skipped_blank),
            );
        }

        info!(
            file = %master.file_name,
            identifier_column = %table.columns[column],
            rows = ids.values.len(),
            skipped_blank = ids.skipped_blank,
            "主表读取完成"
        );
        Ok(ids.values)
    }

    fn read_source(&self, role: SourceRole, upload: &Upload) -> ConsolidationResult<RoleTable> {
        let version = self.request.export_version.as_deref();
        let config = self
            .profile
            .role(role)
            .ok_or_else(|| ConsolidationError::ProfileError {
                path: self.profile.name.clone(),
                reason: format!("角色 {} 未配置", role),
            })?;

        let key_column = config.effective_key_column(version).clone();
        let header_row = self
            .request
            .header_rows
            .get(&role)
            .copied()
            .unwrap_or_else(|| config.effective_header_row(version));

        let raw = self
            .parser
            .read_sheet(&upload.file_name, &upload.bytes, &config.sheet)?;
        let header = self.locate_header(&raw, header_row, |name| column_matches(&key_column, name));

        let table: Table = match header {
            Some(row) => self.normalizer.normalize(raw.into_table(row)),
            None => {
                return Err(ConsolidationError::ColumnNotFound {
                    file: upload.file_name.clone(),
                    role,
                    column: key_column.to_string(),
                    available: self.scanned_names(&raw, header_row),
                })
            }
        };

        info!(
            file = %upload.file_name,
            role = %role,
            header_row = %header_row,
            rows = table.row_count(),
            columns = table.columns.len(),
            "源表读取完成"
        );

        Ok(RoleTable {
            role,
            file_name: upload.file_name.clone(),
            table,
            key_column,
        })
    }

    /// 确定表头行（固定行直接返回；探测模式按列名判定）
    fn locate_header<F>(&self, raw: &RawSheet, header_row: HeaderRow, is_key: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        match header_row {
            HeaderRow::Fixed(row) => Some(row),
            HeaderRow::Detect { max_scan } => {
                let detected = raw.detect_header_row(max_scan, |cell| {
                    is_key(&self.normalizer.normalize_name(cell))
                });
                debug!(sheet = %raw.sheet_name, detected = ?detected, "表头行探测");
                detected
            }
        }
    }

    /// 探测失败时列出扫描范围内的单元格文本
    fn scanned_names(&self, raw: &RawSheet, header_row: HeaderRow) -> Vec<String> {
        let scan = match header_row {
            HeaderRow::Fixed(row) => row + 1,
            HeaderRow::Detect { max_scan } => max_scan,
        };
        let mut names: Vec<String> = Vec::new();
        for cell in raw.rows.iter().take(scan).flatten() {
            if cell.is_null() {
                continue;
            }
            let name = self.normalizer.normalize_name(&cell.to_string());
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    // ==========================================
    // Joining
    // ==========================================

    /// 执行连接，进入 Ready
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn join(&mut self) -> ConsolidationResult<&ConsolidationOutput> {
        self.expect_stage(PipelineStage::Joining, PipelineStage::Ready)?;

        let validated = match std::mem::replace(&mut self.state, PipelineState::AwaitingInputs) {
            PipelineState::Joining(validated) => *validated,
            other => {
                self.state = other;
                return Err(ConsolidationError::InvalidStateTransition {
                    from: self.stage().to_string(),
                    to: PipelineStage::Ready.to_string(),
                });
            }
        };

        let output = self.join_inputs(validated);
        info!(
            rows = output.summary.total_rows,
            matched_cells = output.summary.matched_cells,
            warnings = output.summary.warning_count,
            diagnostics = output.diagnostics.len(),
            elapsed_ms = output.elapsed_time.as_millis() as u64,
            "整合完成"
        );
        self.state = PipelineState::Ready(Box::new(output));

        self.output().ok_or_else(|| ConsolidationError::InvalidStateTransition {
            from: PipelineStage::Joining.to_string(),
            to: PipelineStage::Ready.to_string(),
        })
    }

    fn join_inputs(&self, validated: ValidatedInputs) -> ConsolidationOutput {
        let ValidatedInputs {
            master_file,
            base_ids,
            role_tables,
            plans,
            mut diagnostics,
        } = validated;

        let mut columns = Vec::with_capacity(plans.len());
        let mut warnings = Vec::new();
        let mut matched_cells = 0;

        {
            let mut resolver = FieldResolver::new(&base_ids, &role_tables);
            for (destination, plan) in &plans {
                debug!(destination = %destination, "解析输出列");
                let field = resolver.execute(destination, plan);
                matched_cells += field.matched;
                warnings.extend(field.warnings);
                columns.push(field.values);
            }

            for index in resolver.indexes() {
                if index.duplicate_keys() > 0 {
                    let count = index.duplicate_keys().to_string();
                    diagnostics.push(
                        Diagnostic::info(
                            DiagnosticKind::DuplicateKeys,
                            Some(index.file_name.as_str()),
                            t_with_args(
                                "diagnostic.duplicate_keys",
                                &[("role", index.role.as_str()), ("count", &count)],
                            ),
                        )
                        .with_count(index.duplicate_keys()),
                    );
                }
            }
        }

        let records: Vec<ConsolidatedRecord> = base_ids
            .into_iter()
            .enumerate()
            .map(|(row, identifier)| ConsolidatedRecord {
                identifier,
                values: columns
                    .iter()
                    .map(|column| column.get(row).cloned().unwrap_or_default())
                    .collect(),
            })
            .collect();

        let mut source_files: Vec<String> =
            role_tables.values().map(|t| t.file_name.clone()).collect();
        source_files.sort();
        source_files.dedup();

        let summary = RunSummary {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            master_file,
            source_files,
            total_rows: records.len(),
            matched_cells,
            warning_count: warnings.len(),
        };

        ConsolidationOutput {
            table: ConsolidatedTable {
                columns: self.profile.output_columns(),
                records,
            },
            warnings,
            diagnostics,
            summary,
            elapsed_time: self.started.map(|s| s.elapsed()).unwrap_or_default(),
        }
    }

    // ==========================================
    // 驱动全部步骤 / 输出
    // ==========================================

    /// 校验 + 连接
    pub fn run(&mut self) -> ConsolidationResult<&ConsolidationOutput> {
        self.validate()?;
        self.join()
    }

    /// 生成输出工作簿字节（仅 Ready 状态）
    pub fn write_output(&self) -> ConsolidationResult<Vec<u8>> {
        match self.output() {
            Some(output) => write_workbook(&output.table, &self.profile.output_sheet),
            None => Err(ConsolidationError::InvalidStateTransition {
                from: self.stage().to_string(),
                to: PipelineStage::Ready.to_string(),
            }),
        }
    }
}
