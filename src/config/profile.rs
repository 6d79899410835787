use crate::domain::mapping::{ColumnSpec, FieldMapping, ValueTransform};
use crate::domain::table::CellValue;
use crate::domain::types::{HeaderRow, SheetSelector, SourceRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 输出文件名约定
pub const OUTPUT_FILE_NAME: &str = "Maestro_Consolidado.xlsx";

/// 输出文件 MIME 类型
pub const OUTPUT_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// 整合配置（持久化对象，JSON）
///
/// 各导出变体（表头行、文件名规则、字段集）只在此处体现差异，流程代码只有一份。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationProfile {
    /// 配置名称
    pub name: String,

    /// 主表读取设置
    pub master: MasterConfig,

    /// SKU 列识别规则
    pub identifier: IdentifierRule,

    /// 角色配置（顺序即文件名匹配优先级）
    pub roles: Vec<RoleConfig>,

    /// 输出列映射（顺序即输出列顺序）
    pub mappings: Vec<FieldMapping>,

    /// 输出工作表名称
    pub output_sheet: String,
}

/// 主表读取设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub sheet: SheetSelector,
    pub header_row: HeaderRow,
    /// SKU 为空的行是否跳过
    pub skip_blank_identifiers: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::NamedOrSole("Maestro".to_string()),
            header_row: HeaderRow::Fixed(0),
            skip_blank_identifiers: true,
        }
    }
}

/// SKU 列识别规则
///
/// 列名（大写后）须包含全部 `all_of`，且至少包含一个 `any_of`（双语表头）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierRule {
    pub all_of: Vec<String>,
    pub any_of: Vec<String>,
    /// 输出表中 SKU 列的名称
    pub output_name: String,
}

impl Default for IdentifierRule {
    fn default() -> Self {
        Self {
            all_of: vec!["SKU".to_string()],
            any_of: vec!["CÓDIGO".to_string(), "CODIGO".to_string(), "CODE".to_string()],
            output_name: "CodigoLocal".to_string(),
        }
    }
}

impl IdentifierRule {
    /// 判断列名是否为 SKU 列（大小写不敏感）
    pub fn matches(&self, column: &str) -> bool {
        let upper = column.to_uppercase();
        self.all_of.iter().all(|t| upper.contains(&t.to_uppercase()))
            && (self.any_of.is_empty()
                || self.any_of.iter().any(|t| upper.contains(&t.to_uppercase())))
    }
}

/// 文件名匹配规则（对小写文件名做子串匹配）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilenameRule {
    pub include_any: Vec<String>,
    pub exclude_any: Vec<String>,
}

impl FilenameRule {
    pub fn new(include_any: &[&str], exclude_any: &[&str]) -> Self {
        Self {
            include_any: include_any.iter().map(|s| s.to_lowercase()).collect(),
            exclude_any: exclude_any.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, lowercase_name: &str) -> bool {
        self.include_any
            .iter()
            .any(|p| lowercase_name.contains(p.as_str()))
            && !self
                .exclude_any
                .iter()
                .any(|p| lowercase_name.contains(p.as_str()))
    }
}

/// 角色配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    pub role: SourceRole,
    pub filename: FilenameRule,
    pub key_column: ColumnSpec,
    #[serde(default = "default_source_header_row")]
    pub header_row: HeaderRow,
    #[serde(default)]
    pub sheet: SheetSelector,
    /// 按导出版本覆盖表头行/键列
    #[serde(default)]
    pub versions: BTreeMap<String, RoleVersion>,
}

/// 导出版本覆盖项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoleVersion {
    pub header_row: Option<HeaderRow>,
    pub key_column: Option<ColumnSpec>,
}

fn default_source_header_row() -> HeaderRow {
    // Product Cloud 导出的表头在第 2 行
    HeaderRow::Fixed(1)
}

impl RoleConfig {
    pub fn new(role: SourceRole, filename: FilenameRule, key_column: ColumnSpec) -> Self {
        Self {
            role,
            filename,
            key_column,
            header_row: default_source_header_row(),
            sheet: SheetSelector::First,
            versions: BTreeMap::new(),
        }
    }

    /// 按导出版本取生效的表头行
    pub fn effective_header_row(&self, version: Option<&str>) -> HeaderRow {
        version
            .and_then(|v| self.versions.get(v))
            .and_then(|v| v.header_row)
            .unwrap_or(self.header_row)
    }

    /// 按导出版本取生效的键列
    pub fn effective_key_column(&self, version: Option<&str>) -> &ColumnSpec {
        version
            .and_then(|v| self.versions.get(v))
            .and_then(|v| v.key_column.as_ref())
            .unwrap_or(&self.key_column)
    }
}

impl ConsolidationProfile {
    pub fn role(&self, role: SourceRole) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.role == role)
    }

    /// 映射中用到的全部角色（去重，保持首次出现顺序）
    pub fn required_roles(&self) -> Vec<SourceRole> {
        let mut roles = Vec::new();
        for role in self.mappings.iter().flat_map(|m| m.roles()) {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }
        roles
    }

    /// 输出列名（SKU 列 + 映射列）
    pub fn output_columns(&self) -> Vec<String> {
        std::iter::once(self.identifier.output_name.clone())
            .chain(self.mappings.iter().map(|m| m.destination.clone()))
            .collect()
    }
}

// ==========================================
// 内置配置: Product Cloud 导出 + 主表
// ==========================================

const SHIP_TO_TOKENS: [&str; 3] = ["shipto", "ship_to", "ship-to"];
const SHIP_FROM_TOKENS: [&str; 3] = ["shipfrom", "ship_from", "ship-from"];

fn logistic_key() -> ColumnSpec {
    ColumnSpec::aliases(&["PR.LogistU.ERPID", "ERPID"])
}

impl Default for ConsolidationProfile {
    fn default() -> Self {
        let ship_exclusions: Vec<&str> = SHIP_TO_TOKENS
            .iter()
            .chain(SHIP_FROM_TOKENS.iter())
            .copied()
            .collect();
        let mut logistic_exclusions = vec!["shipping"];
        logistic_exclusions.extend(SHIP_TO_TOKENS);

        let roles = vec![
            RoleConfig::new(
                SourceRole::ShipTo,
                FilenameRule::new(&SHIP_TO_TOKENS, &[]),
                logistic_key(),
            ),
            RoleConfig::new(
                SourceRole::ShipFrom,
                FilenameRule::new(&SHIP_FROM_TOKENS, &[]),
                logistic_key(),
            ),
            RoleConfig::new(
                SourceRole::Shipping,
                FilenameRule::new(&["shipping"], &ship_exclusions),
                logistic_key(),
            ),
            RoleConfig::new(
                SourceRole::ConsumerUnit,
                FilenameRule::new(&["consumerunits", "cu_recipients"], &[]),
                ColumnSpec::aliases(&["PR.ConsumU.ERPID", "ERPID"]),
            ),
            RoleConfig::new(
                SourceRole::LogisticUnit,
                FilenameRule::new(&["logisticunits"], &logistic_exclusions),
                logistic_key(),
            ),
            RoleConfig::new(
                SourceRole::LeadTime,
                FilenameRule::new(&["leadtime", "lead_time"], &[]),
                logistic_key(),
            ),
            RoleConfig::new(
                SourceRole::General,
                FilenameRule::new(&["glossary", "glosario", "general"], &[]),
                ColumnSpec::from("ERPID"),
            ),
            RoleConfig::new(
                SourceRole::MasterList,
                FilenameRule::new(&["maestro", "master"], &[]),
                ColumnSpec::from("SKU"),
            ),
        ];

        let mappings = vec![
            FieldMapping::lookup(
                "Descripcion",
                SourceRole::LogisticUnit,
                ColumnSpec::aliases(&["PR.LogistU.MyOwnPortfolio", "MyOwnPortfolio"]),
            ),
            FieldMapping::lookup(
                "Mercado",
                SourceRole::ConsumerUnit,
                ColumnSpec::aliases(&["PR.LiquiQual.CountryOfOrigin", "CountryOfOrigin"]),
            ),
            FieldMapping::constant("ABC", CellValue::Number(0.0)),
            FieldMapping::lookup(
                "Pack Size (UxC)",
                SourceRole::LogisticUnit,
                ColumnSpec::aliases(&["PR.LogistU.NumberOfConsumerUnit", "NumberOfConsumerUnit"]),
            ),
            FieldMapping::lookup(
                "Bottle size",
                SourceRole::LogisticUnit,
                ColumnSpec::aliases(&["PR.LogistU.Size", "Size"]),
            )
            .with_transform(ValueTransform::Scale { factor: 10.0 })
            .optional(),
            FieldMapping::lookup(
                "DispatchToReceiveLeadTime",
                SourceRole::Shipping,
                ColumnSpec::aliases(&[
                    "PR.Shipping.DispatchToReceiveLeadTime",
                    "DispatchToReceiveLeadTime",
                ]),
            ),
            FieldMapping::lookup(
                "OrderToReceiveLeadTime",
                SourceRole::Shipping,
                ColumnSpec::aliases(&[
                    "PR.Shipping.OrderToReceiveLeadTime",
                    "OrderToReceiveLeadTime",
                ]),
            ),
            FieldMapping::lookup(
                "OriginWarehouse",
                SourceRole::ShipFrom,
                ColumnSpec::aliases(&[
                    "PR.ShipFrom.InitiatorWarehouseName",
                    "InitiatorWarehouseName",
                ]),
            )
            .with_fallback(SourceRole::Shipping),
            FieldMapping::lookup(
                "DestinationWarehouse",
                SourceRole::ShipTo,
                ColumnSpec::aliases(&[
                    "PR.ShipTo.RecipientWarehouseName",
                    "RecipientWarehouseName",
                ]),
            )
            .with_fallback(SourceRole::Shipping),
        ];

        Self {
            name: "product-cloud".to_string(),
            master: MasterConfig::default(),
            identifier: IdentifierRule::default(),
            roles,
            mappings,
            output_sheet: "Maestro".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rule_bilingual() {
        let rule = IdentifierRule::default();
        assert!(rule.matches("SKU Código local"));
        assert!(rule.matches("sku code"));
        assert!(rule.matches("Codigo SKU"));
        assert!(!rule.matches("SKU"));
        assert!(!rule.matches("Código"));
    }

    #[test]
    fn test_filename_rule_exclusion() {
        let rule = FilenameRule::new(&["shipping"], &["shipto"]);
        assert!(rule.matches("logisticunits_shipping_2024.xlsx"));
        assert!(!rule.matches("shipping_shipto.xlsx"));
    }

    #[test]
    fn test_default_profile_shape() {
        let profile = ConsolidationProfile::default();
        assert_eq!(
            profile.required_roles(),
            vec![
                SourceRole::LogisticUnit,
                SourceRole::ConsumerUnit,
                SourceRole::Shipping,
                SourceRole::ShipFrom,
                SourceRole::ShipTo,
            ]
        );
        let columns = profile.output_columns();
        assert_eq!(columns[0], "CodigoLocal");
        assert_eq!(columns[1], "Descripcion");
        assert_eq!(columns.len(), profile.mappings.len() + 1);
    }

    #[test]
    fn test_version_overrides() {
        let mut role = RoleConfig::new(
            SourceRole::Shipping,
            FilenameRule::new(&["shipping"], &[]),
            ColumnSpec::from("PR.LogistU.ERPID"),
        );
        role.versions.insert(
            "legacy".to_string(),
            RoleVersion {
                header_row: Some(HeaderRow::Fixed(0)),
                key_column: Some(ColumnSpec::from("ERPID")),
            },
        );

        assert_eq!(role.effective_header_row(None), HeaderRow::Fixed(1));
        assert_eq!(role.effective_header_row(Some("legacy")), HeaderRow::Fixed(0));
        assert_eq!(role.effective_header_row(Some("other")), HeaderRow::Fixed(1));
        assert_eq!(role.effective_key_column(Some("legacy")), &ColumnSpec::from("ERPID"));
    }

    #[test]
    fn test_profile_roundtrip_json() {
        let profile = ConsolidationProfile::default();
        let json = serde_json::to_string(&profile).unwrap();
        let back: ConsolidationProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mappings, profile.mappings);
        assert_eq!(back.roles.len(), profile.roles.len());
    }
}
