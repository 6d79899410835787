// ==========================================
// Maestro SKU 整合工具 - 字段映射规则
// ==========================================
// 职责: 声明式输出列规则（目标列 ← 角色/键列/值列/变换）
// 红线: 规则即数据，不为每个导出版本复制代码
// ==========================================

use crate::domain::table::CellValue;
use crate::domain::types::SourceRole;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ColumnSpec - 列名规格（支持别名）
// ==========================================
// 不同导出版本列名会漂移（如 "PR.LogistU.ERPID" / "ERPID"），按顺序尝试
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Single(String),
    Aliases(Vec<String>),
}

impl ColumnSpec {
    pub fn aliases(names: &[&str]) -> Self {
        ColumnSpec::Aliases(names.iter().map(|n| n.to_string()).collect())
    }

    /// 候选列名（按优先级）
    pub fn candidates(&self) -> &[String] {
        match self {
            ColumnSpec::Single(name) => std::slice::from_ref(name),
            ColumnSpec::Aliases(names) => names,
        }
    }
}

impl From<&str> for ColumnSpec {
    fn from(name: &str) -> Self {
        ColumnSpec::Single(name.to_string())
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.candidates().join(" | "))
    }
}

// ==========================================
// ValueTransform - 单元格变换
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueTransform {
    /// 乘以常数因子（如瓶容量 ×10）
    Scale { factor: f64 },
}

impl ValueTransform {
    /// 应用变换
    ///
    /// # 返回
    /// - Some(value): 变换成功（空值保持为空）
    /// - None: 值非数字，无法变换
    pub fn apply(&self, value: &CellValue) -> Option<CellValue> {
        match (self, value) {
            (_, CellValue::Null) => Some(CellValue::Null),
            (ValueTransform::Scale { factor }, CellValue::Number(n)) => {
                Some(CellValue::Number(n * factor))
            }
            (ValueTransform::Scale { .. }, CellValue::Text(_)) => None,
        }
    }
}

impl fmt::Display for ValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTransform::Scale { factor } => write!(f, "×{}", factor),
        }
    }
}

// ==========================================
// FieldSource - 输出列取值来源
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FieldSource {
    /// 按 SKU 在某角色表中查找
    Lookup {
        /// 角色偏好链（如 [ShipTo, Shipping]：优先 ShipTo，缺失时回退 Shipping）
        roles: Vec<SourceRole>,
        /// 覆盖角色默认键列（可选）
        #[serde(default)]
        key_column: Option<ColumnSpec>,
        value_column: ColumnSpec,
        #[serde(default)]
        transform: Option<ValueTransform>,
        /// 值列缺失时整列置空（仅警告），否则为致命错误
        #[serde(default)]
        optional: bool,
    },
    /// 常量列
    Constant { value: CellValue },
}

// ==========================================
// FieldMapping - 字段映射规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// 输出列名
    pub destination: String,
    #[serde(flatten)]
    pub source: FieldSource,
}

impl FieldMapping {
    pub fn lookup(destination: &str, role: SourceRole, value_column: ColumnSpec) -> Self {
        Self {
            destination: destination.to_string(),
            source: FieldSource::Lookup {
                roles: vec![role],
                key_column: None,
                value_column,
                transform: None,
                optional: false,
            },
        }
    }

    pub fn constant(destination: &str, value: CellValue) -> Self {
        Self {
            destination: destination.to_string(),
            source: FieldSource::Constant { value },
        }
    }

    /// 追加回退角色
    pub fn with_fallback(mut self, role: SourceRole) -> Self {
        if let FieldSource::Lookup { roles, .. } = &mut self.source {
            roles.push(role);
        }
        self
    }

    pub fn with_key(mut self, key: ColumnSpec) -> Self {
        if let FieldSource::Lookup { key_column, .. } = &mut self.source {
            *key_column = Some(key);
        }
        self
    }

    pub fn with_transform(mut self, value_transform: ValueTransform) -> Self {
        if let FieldSource::Lookup { transform, .. } = &mut self.source {
            *transform = Some(value_transform);
        }
        self
    }

    pub fn optional(mut self) -> Self {
        if let FieldSource::Lookup { optional, .. } = &mut self.source {
            *optional = true;
        }
        self
    }

    /// 该映射依赖的角色链（常量列为空）
    pub fn roles(&self) -> &[SourceRole] {
        match &self.source {
            FieldSource::Lookup { roles, .. } => roles,
            FieldSource::Constant { .. } => &[],
        }
    }
}
