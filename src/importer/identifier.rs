// ==========================================
// Maestro SKU 整合工具 - SKU 列定位
// ==========================================
// 职责: 在主表中定位 SKU 列并抽取基础 SKU 序列
// ==========================================

use crate::domain::table::{CellValue, Table};
use crate::importer::error::{ConsolidationError, ConsolidationResult};

/// 定位 SKU 列
///
/// # 参数
/// - table: 已标准化列名的主表
/// - is_identifier: 列名判定
/// - file: 主表文件名（用于错误信息）
///
/// # 返回
/// - Ok(usize): 第一个命中的列下标（多列命中时取最左侧）
/// - Err(IdentifierColumnNotFound): 无命中，附全部列名
pub fn find_identifier_column<F>(
    table: &Table,
    is_identifier: F,
    file: &str,
) -> ConsolidationResult<usize>
where
    F: Fn(&str) -> bool,
{
    table
        .columns
        .iter()
        .position(|c| is_identifier(c))
        .ok_or_else(|| ConsolidationError::IdentifierColumnNotFound {
            file: file.to_string(),
            available: table.columns.clone(),
        })
}

/// 基础 SKU 序列
#[derive(Debug, Clone, PartialEq)]
pub struct BaseIdentifiers {
    pub values: Vec<CellValue>,
    /// 因 SKU 为空而跳过的行数
    pub skipped_blank: usize,
}

/// 按主表行序抽取 SKU
///
/// skip_blank 为 true 时丢弃 SKU 为空（或空白文本）的行
pub fn extract_identifiers(table: &Table, column: usize, skip_blank: bool) -> BaseIdentifiers {
    let mut values = Vec::with_capacity(table.row_count());
    let mut skipped_blank = 0;

    for value in table.column_values(column) {
        if skip_blank && value.as_join_key().is_none() {
            skipped_blank += 1;
            continue;
        }
        values.push(value);
    }

    BaseIdentifiers {
        values,
        skipped_blank,
    }
}
