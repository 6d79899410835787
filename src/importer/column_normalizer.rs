// ==========================================
// Maestro SKU 整合工具 - 列名标准化器实现
// ==========================================
// 阶段 2: 换行 → 空格 / TRIM / 空列名补齐 / 重名去重
// 红线: 只改列名，不动单元格值与列顺序
// ==========================================

use crate::domain::table::Table;
use crate::importer::consolidation_trait::ColumnNormalizer;
use std::collections::HashSet;

pub struct DefaultColumnNormalizer;

impl ColumnNormalizer for DefaultColumnNormalizer {
    fn normalize_name(&self, raw: &str) -> String {
        raw.replace("\r\n", " ")
            .replace(['\n', '\r'], " ")
            .trim()
            .to_string()
    }

    fn normalize(&self, table: Table) -> Table {
        let Table { columns, rows } = table;

        let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
        let columns = columns
            .iter()
            .enumerate()
            .map(|(idx, raw)| {
                let mut name = self.normalize_name(raw);
                if name.is_empty() {
                    name = format!("Unnamed: {}", idx);
                }
                let unique = dedupe(&name, &seen);
                seen.insert(unique.clone());
                unique
            })
            .collect();

        Table { columns, rows }
    }
}

/// 重名列追加 `.1`、`.2` ... 后缀（首次出现保留原名）
fn dedupe(name: &str, seen: &HashSet<String>) -> String {
    if !seen.contains(name) {
        return name.to_string();
    }
    (1..)
        .map(|k| format!("{}.{}", name, k))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::CellValue;

    fn table(columns: &[&str]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![columns.iter().map(|c| CellValue::from(*c)).collect()],
        )
    }

    #[test]
    fn test_line_breaks_become_spaces() {
        let n = DefaultColumnNormalizer;
        assert_eq!(n.normalize_name("SKU\nCódigo"), "SKU Código");
        assert_eq!(n.normalize_name("SKU\r\nCódigo"), "SKU Código");
        assert_eq!(n.normalize_name("  Pack\rSize  "), "Pack Size");
        assert_eq!(n.normalize_name("\n"), "");
    }

    #[test]
    fn test_values_untouched() {
        let original = table(&["SKU\nCódigo", " Nombre "]);
        let normalized = DefaultColumnNormalizer.normalize(original.clone());
        assert_eq!(normalized.columns, vec!["SKU Código", "Nombre"]);
        assert_eq!(normalized.rows, original.rows);
    }

    #[test]
    fn test_blank_and_duplicate_names() {
        let normalized = DefaultColumnNormalizer.normalize(table(&["A", "", "A", "A.1", " "]));
        assert_eq!(
            normalized.columns,
            vec!["A", "Unnamed: 1", "A.1", "A.1.1", "Unnamed: 4"]
        );
    }

    #[test]
    fn test_idempotent() {
        let n = DefaultColumnNormalizer;
        let once = n.normalize(table(&["X\nY", "X Y", "", "Z\r\n"]));
        let twice = n.normalize(once.clone());
        assert_eq!(once, twice);
    }
}
