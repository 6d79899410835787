// ==========================================
// Maestro SKU 整合工具 - 领域类型定义
// ==========================================
// 职责: 数据源角色、工作表选择器、表头行设置
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 数据源角色 (Source Role)
// ==========================================
// 封闭枚举: 每个上传文件最多归属一个角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceRole {
    MasterList,   // 主表
    LogisticUnit, // 物流单元导出
    ConsumerUnit, // 消费单元导出
    Shipping,     // 发运导出
    ShipFrom,     // 发货仓导出
    ShipTo,       // 收货仓导出
    LeadTime,     // 交期导出
    General,      // 通用/术语表
}

impl SourceRole {
    pub const ALL: [SourceRole; 8] = [
        SourceRole::MasterList,
        SourceRole::LogisticUnit,
        SourceRole::ConsumerUnit,
        SourceRole::Shipping,
        SourceRole::ShipFrom,
        SourceRole::ShipTo,
        SourceRole::LeadTime,
        SourceRole::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceRole::MasterList => "MasterList",
            SourceRole::LogisticUnit => "LogisticUnit",
            SourceRole::ConsumerUnit => "ConsumerUnit",
            SourceRole::Shipping => "Shipping",
            SourceRole::ShipFrom => "ShipFrom",
            SourceRole::ShipTo => "ShipTo",
            SourceRole::LeadTime => "LeadTime",
            SourceRole::General => "General",
        }
    }
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceRole {
    type Err = String;

    /// 大小写不敏感解析（命令行参数使用）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = SourceRole::ALL.iter().map(|r| r.as_str()).collect();
                format!("未知角色: {}（可选: {}）", s, names.join(", "))
            })
    }
}

// ==========================================
// 工作表选择器 (Sheet Selector)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value")]
pub enum SheetSelector {
    /// 第一个工作表
    #[default]
    First,
    /// 按位置（从 0 开始）
    Index(usize),
    /// 按名称（不存在则报错）
    Name(String),
    /// 优先按名称；不存在时若工作簿仅有一个工作表则使用该表
    NamedOrSole(String),
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => write!(f, "#0"),
            SheetSelector::Index(i) => write!(f, "#{}", i),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
            SheetSelector::NamedOrSole(name) => write!(f, "'{}'", name),
        }
    }
}

// ==========================================
// 表头行设置 (Header Row)
// ==========================================
// 不同导出版本表头位于第 0/1/2 行，必须显式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum HeaderRow {
    /// 固定行号（从 0 开始）
    Fixed(usize),
    /// 在前 max_scan 行中查找包含连接键列的行
    Detect { max_scan: usize },
}

impl Default for HeaderRow {
    fn default() -> Self {
        HeaderRow::Fixed(0)
    }
}

impl fmt::Display for HeaderRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderRow::Fixed(n) => write!(f, "{}", n),
            HeaderRow::Detect { max_scan } => write!(f, "auto(≤{})", max_scan),
        }
    }
}

impl FromStr for HeaderRow {
    type Err = String;

    /// 解析 "2" 或 "auto" / "auto:5"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("auto") {
            let max_scan = match rest.strip_prefix(':') {
                Some(n) => n
                    .parse::<usize>()
                    .map_err(|_| format!("无效的表头扫描行数: {}", n))?,
                None if rest.is_empty() => 5,
                None => return Err(format!("无效的表头行: {}", s)),
            };
            return Ok(HeaderRow::Detect { max_scan });
        }
        s.parse::<usize>()
            .map(HeaderRow::Fixed)
            .map_err(|_| format!("无效的表头行: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_role_parse_case_insensitive() {
        assert_eq!("shipping".parse::<SourceRole>(), Ok(SourceRole::Shipping));
        assert_eq!("ShipTo".parse::<SourceRole>(), Ok(SourceRole::ShipTo));
        assert!("unknown".parse::<SourceRole>().is_err());
    }

    #[test]
    fn test_header_row_parse() {
        assert_eq!("2".parse::<HeaderRow>(), Ok(HeaderRow::Fixed(2)));
        assert_eq!("auto".parse::<HeaderRow>(), Ok(HeaderRow::Detect { max_scan: 5 }));
        assert_eq!("auto:3".parse::<HeaderRow>(), Ok(HeaderRow::Detect { max_scan: 3 }));
        assert!("x".parse::<HeaderRow>().is_err());
        assert!("autox".parse::<HeaderRow>().is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(SourceRole::ConsumerUnit.to_string(), "ConsumerUnit");
    }
}
