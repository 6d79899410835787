// ==========================================
// Maestro SKU 整合工具 - 字段解析 / 连接引擎
// ==========================================
// 阶段 4: 列定位（别名 + 后缀匹配）→ 键索引 → 按 SKU 左连接取值
// 规则:
// - 结果与基础 SKU 序列等长、同序
// - 重复键保留最后一条
// - 未命中 → 空值（行保留）
// - 变换失败 → 空值 + CellTransformWarning
// ==========================================

use crate::domain::consolidation::CellTransformWarning;
use crate::domain::mapping::{ColumnSpec, FieldMapping, FieldSource, ValueTransform};
use crate::domain::table::{CellValue, Table};
use crate::domain::types::SourceRole;
use crate::i18n::t_with_args;
use crate::importer::error::{ConsolidationError, ConsolidationResult};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

// ==========================================
// 列定位
// ==========================================

/// 列名最后一个点分段（"PR.LogistU.ERPID" → "ERPID"）
fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// 定位列
///
/// # 匹配顺序
/// 1. 任一别名精确匹配（按别名顺序）
/// 2. 任一别名大小写不敏感匹配
/// 3. 别名与列名的最后点分段大小写不敏感匹配（须唯一）
///
/// # 返回
/// - Ok(usize): 列下标
/// - Err(AmbiguousColumn): 后缀匹配到多个列
/// - Err(ColumnNotFound): 无匹配，附全部列名
pub fn resolve_column(
    table: &Table,
    spec: &ColumnSpec,
    file: &str,
    role: SourceRole,
) -> ConsolidationResult<usize> {
    let candidates = spec.candidates();

    for alias in candidates {
        if let Some(idx) = table.columns.iter().position(|c| c == alias) {
            return Ok(idx);
        }
    }

    for alias in candidates {
        let alias_lower = alias.to_lowercase();
        if let Some(idx) = table
            .columns
            .iter()
            .position(|c| c.to_lowercase() == alias_lower)
        {
            return Ok(idx);
        }
    }

    for alias in candidates {
        let segment = last_segment(alias).to_lowercase();
        let hits: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| last_segment(c).to_lowercase() == segment)
            .map(|(idx, _)| idx)
            .collect();

        match hits.as_slice() {
            [] => continue,
            [idx] => return Ok(*idx),
            many => {
                return Err(ConsolidationError::AmbiguousColumn {
                    file: file.to_string(),
                    role,
                    column: spec.to_string(),
                    candidates: many.iter().map(|i| table.columns[*i].clone()).collect(),
                })
            }
        }
    }

    Err(ConsolidationError::ColumnNotFound {
        file: file.to_string(),
        role,
        column: spec.to_string(),
        available: table.columns.clone(),
    })
}

/// 列名是否与规格匹配（表头行探测使用）
pub fn column_matches(spec: &ColumnSpec, name: &str) -> bool {
    let name_lower = name.to_lowercase();
    let name_segment = last_segment(&name_lower);
    spec.candidates().iter().any(|alias| {
        let alias_lower = alias.to_lowercase();
        alias_lower == name_lower || last_segment(&alias_lower) == name_segment
    })
}

// ==========================================
// RoleTable - 已解析的角色表
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RoleTable {
    pub role: SourceRole,
    pub file_name: String,
    pub table: Table,
    /// 生效的键列规格（已应用导出版本覆盖）
    pub key_column: ColumnSpec,
}

pub type RoleTables = BTreeMap<SourceRole, RoleTable>;

// ==========================================
// LookupIndex - 键索引
// ==========================================
#[derive(Debug, Clone)]
pub struct LookupIndex {
    pub role: SourceRole,
    pub file_name: String,
    pub key_column: usize,
    rows: HashMap<String, usize>,
    duplicate_keys: usize,
}

impl LookupIndex {
    /// 建立索引（重复键后出现者覆盖先出现者）
    pub fn build(source: &RoleTable, key_column: usize) -> Self {
        let mut rows = HashMap::with_capacity(source.table.row_count());
        let mut duplicate_keys = 0;

        for (row_idx, row) in source.table.rows.iter().enumerate() {
            let key = match row.get(key_column).and_then(CellValue::as_join_key) {
                Some(key) => key,
                None => continue,
            };
            if rows.insert(key, row_idx).is_some() {
                duplicate_keys += 1;
            }
        }

        debug!(
            role = %source.role,
            file = %source.file_name,
            keys = rows.len(),
            duplicate_keys,
            "键索引建立完成"
        );

        Self {
            role: source.role,
            file_name: source.file_name.clone(),
            key_column,
            rows,
            duplicate_keys,
        }
    }

    /// 查找键对应的行号
    pub fn get(&self, key: &str) -> Option<usize> {
        self.rows.get(key).copied()
    }

    /// 被覆盖的重复键数量
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }
}

// ==========================================
// MappingPlan - 列定位后的映射执行计划
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum MappingPlan {
    Constant(CellValue),
    Lookup {
        role: SourceRole,
        key_column: usize,
        /// None: 可选值列缺失，整列置空
        value_column: Option<usize>,
        transform: Option<ValueTransform>,
    },
}

/// 单个映射的解析结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedField {
    pub values: Vec<CellValue>,
    pub warnings: Vec<CellTransformWarning>,
    /// 命中键的行数
    pub matched: usize,
}

// ==========================================
// FieldResolver - 连接引擎
// ==========================================
pub struct FieldResolver<'a> {
    base_ids: &'a [CellValue],
    base_keys: Vec<Option<String>>,
    role_tables: &'a RoleTables,
    indexes: BTreeMap<(SourceRole, usize), LookupIndex>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(base_ids: &'a [CellValue], role_tables: &'a RoleTables) -> Self {
        Self {
            base_ids,
            base_keys: base_ids.iter().map(CellValue::as_join_key).collect(),
            role_tables,
            indexes: BTreeMap::new(),
        }
    }

    /// 为映射定位角色与列（不取值）
    ///
    /// # 返回
    /// - Ok(MappingPlan)
    /// - Err(MissingSource): 角色链中无已解析的表
    /// - Err(ColumnNotFound / AmbiguousColumn): 键列或非可选值列无法定位
    pub fn plan(
        role_tables: &RoleTables,
        mapping: &FieldMapping,
    ) -> ConsolidationResult<MappingPlan> {
        let (roles, key_override, value_column, transform, optional) = match &mapping.source {
            FieldSource::Constant { value } => return Ok(MappingPlan::Constant(value.clone())),
            FieldSource::Lookup {
                roles,
                key_column,
                value_column,
                transform,
                optional,
            } => (roles, key_column, value_column, transform, *optional),
        };

        let source = roles
            .iter()
            .find_map(|r| role_tables.get(r))
            .ok_or_else(|| ConsolidationError::MissingSource {
                role: roles.first().copied().unwrap_or(SourceRole::General),
                accepted: roles.clone(),
            })?;

        let key_spec = key_override.as_ref().unwrap_or(&source.key_column);
        let key_column = resolve_column(&source.table, key_spec, &source.file_name, source.role)?;

        let value_column =
            match resolve_column(&source.table, value_column, &source.file_name, source.role) {
                Ok(idx) => Some(idx),
                Err(ConsolidationError::ColumnNotFound { .. }) if optional => None,
                Err(e) => return Err(e),
            };

        Ok(MappingPlan::Lookup {
            role: source.role,
            key_column,
            value_column,
            transform: *transform,
        })
    }

    /// 定位并取值
    pub fn resolve(&mut self, mapping: &FieldMapping) -> ConsolidationResult<ResolvedField> {
        let plan = Self::plan(self.role_tables, mapping)?;
        Ok(self.execute(&mapping.destination, &plan))
    }

    /// 按执行计划取值
    pub fn execute(&mut self, destination: &str, plan: &MappingPlan) -> ResolvedField {
        match plan {
            MappingPlan::Constant(value) => ResolvedField {
                values: vec![value.clone(); self.base_ids.len()],
                warnings: Vec::new(),
                matched: 0,
            },
            MappingPlan::Lookup {
                value_column: None,
                ..
            } => ResolvedField {
                values: vec![CellValue::Null; self.base_ids.len()],
                warnings: Vec::new(),
                matched: 0,
            },
            MappingPlan::Lookup {
                role,
                key_column,
                value_column: Some(value_column),
                transform,
            } => {
                let (rows, matched) = self.merge(*role, *key_column, &[*value_column]);
                let mut values: Vec<CellValue> = rows
                    .into_iter()
                    .map(|mut row| row.pop().unwrap_or_default())
                    .collect();

                let mut warnings = Vec::new();
                if let Some(transform) = transform {
                    for (value, id) in values.iter_mut().zip(self.base_ids) {
                        match transform.apply(value) {
                            Some(transformed) => *value = transformed,
                            None => {
                                warn!(
                                    identifier = %id,
                                    destination,
                                    value = %value,
                                    "单元格变换失败，置为空值"
                                );
                                let raw = value.to_string();
                                let message = t_with_args(
                                    "warning.transform_failed",
                                    &[("value", &raw), ("transform", &transform.to_string())],
                                );
                                warnings.push(CellTransformWarning {
                                    identifier: id.to_string(),
                                    destination: destination.to_string(),
                                    value: raw,
                                    message,
                                });
                                *value = CellValue::Null;
                            }
                        }
                    }
                }

                ResolvedField {
                    values,
                    warnings,
                    matched,
                }
            }
        }
    }

    /// 按键一次投影多个值列
    ///
    /// # 返回
    /// - 每个基础 SKU 一行（列顺序同 value_columns；未命中为全空行）
    /// - 命中行数
    pub fn merge(
        &mut self,
        role: SourceRole,
        key_column: usize,
        value_columns: &[usize],
    ) -> (Vec<Vec<CellValue>>, usize) {
        let role_tables = self.role_tables;
        let source = match role_tables.get(&role) {
            Some(source) => source,
            None => {
                return (
                    vec![vec![CellValue::Null; value_columns.len()]; self.base_ids.len()],
                    0,
                )
            }
        };

        let index = self
            .indexes
            .entry((role, key_column))
            .or_insert_with(|| LookupIndex::build(source, key_column));

        let mut matched = 0;
        let rows = self
            .base_keys
            .iter()
            .map(|key| match key.as_deref().and_then(|k| index.get(k)) {
                Some(row) => {
                    matched += 1;
                    value_columns
                        .iter()
                        .map(|col| source.table.cell(row, *col).clone())
                        .collect()
                }
                None => vec![CellValue::Null; value_columns.len()],
            })
            .collect();

        (rows, matched)
    }

    /// 已建立的键索引（按角色、键列排序）
    pub fn indexes(&self) -> impl Iterator<Item = &LookupIndex> {
        self.indexes.values()
    }
}
