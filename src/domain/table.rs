// ==========================================
// Maestro SKU 整合工具 - 表格领域模型
// ==========================================
// 职责: 工作簿解析后的内存表结构（列名 + 行 + 单元格值）
// 红线: 不含解析逻辑,不含合并逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CellValue - 单元格值
// ==========================================
// 宽松类型: 数字 / 文本 / 空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl CellValue {
    /// 由文本构造单元格值（数字样式的文本转为数字）
    ///
    /// # 规则
    /// - 空白文本 → Null
    /// - 有限数字、无前导 `+`、无多余前导零 → Number
    /// - 其他 → Text（保留原文）
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return CellValue::Null;
        }
        match parse_numeric_text(raw) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// 连接键（JOIN KEY）
    ///
    /// # 返回
    /// - Some(String): 规范化文本（整数不带 `.0`，文本去首尾空白）
    /// - None: 空值或空白文本（不参与匹配）
    pub fn as_join_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// 数字格式化：整数值不输出小数部分
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// 判断文本是否为"数字样式"并解析
fn parse_numeric_text(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.starts_with('+') {
        return None;
    }

    // 前导零视为编码（如 "00123"），保持文本
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
        return None;
    }
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }

    // 超出 f64 精度的长编码保持文本，否则不同 SKU 会得到相同连接键
    let integer_part = digits.split(['.', 'e', 'E']).next().unwrap_or(digits);
    if integer_part.trim_start_matches('0').len() > MAX_EXACT_DIGITS {
        return None;
    }

    let n = s.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let is_integer_text = digits.bytes().all(|b| b.is_ascii_digit());
    if is_integer_text && format_number(n) != s {
        return None;
    }
    Some(n)
}

/// f64 可精确表示的十进制有效位数
const MAX_EXACT_DIGITS: usize = 15;

// ==========================================
// Table - 解析后的表
// ==========================================
// 行按位置与列对齐（row[i] 对应 columns[i]）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// 创建表（行长度按列数补齐/截断）
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// 按列下标取整列
    pub fn column_values(&self, column: usize) -> Vec<CellValue> {
        (0..self.rows.len())
            .map(|row| self.cell(row, column).clone())
            .collect()
    }
}
