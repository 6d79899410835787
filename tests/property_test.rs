// ==========================================
// 属性测试: 列名规范化与连接引擎
// ==========================================

use maestro_sku_builder::domain::{CellValue, ColumnSpec, FieldMapping, SourceRole, Table};
use maestro_sku_builder::importer::{
    ColumnNormalizer, DefaultColumnNormalizer, FieldResolver, RoleTable, RoleTables,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn raw_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just(String::new()),
            Just("  ".to_string()),
            Just("A".to_string()),
            Just("A.1".to_string()),
            Just("SKU\nCódigo".to_string()),
            "[a-c]{1,2}",
        ],
        0..8,
    )
}

fn role_tables(rows: &[(String, i64)]) -> RoleTables {
    let table = Table::new(
        vec!["KEY".to_string(), "V".to_string()],
        rows.iter()
            .map(|(k, v)| vec![CellValue::Text(k.clone()), CellValue::Number(*v as f64)])
            .collect(),
    );
    let mut tables = RoleTables::new();
    tables.insert(
        SourceRole::LogisticUnit,
        RoleTable {
            role: SourceRole::LogisticUnit,
            file_name: "LogisticUnits.xlsx".to_string(),
            table,
            key_column: ColumnSpec::from("KEY"),
        },
    );
    tables
}

proptest! {
    #[test]
    fn normalize_is_idempotent_and_unique(names in raw_names()) {
        let normalizer = DefaultColumnNormalizer;
        let once = normalizer.normalize(Table::new(names.clone(), vec![]));
        let twice = normalizer.normalize(once.clone());

        prop_assert_eq!(&once.columns, &twice.columns);
        prop_assert_eq!(once.columns.len(), names.len());

        let unique: HashSet<&String> = once.columns.iter().collect();
        prop_assert_eq!(unique.len(), once.columns.len());
        prop_assert!(once.columns.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn lookup_preserves_order_and_last_wins(
        ids in prop::collection::vec("K[0-5]", 0..12),
        rows in prop::collection::vec(("K[0-5]", 0i64..100), 0..12),
    ) {
        let base: Vec<CellValue> = ids.iter().map(|s| CellValue::Text(s.clone())).collect();
        let tables = role_tables(&rows);

        let mut expected: HashMap<&str, i64> = HashMap::new();
        for (k, v) in &rows {
            expected.insert(k.as_str(), *v);
        }

        let mut resolver = FieldResolver::new(&base, &tables);
        let mapping = FieldMapping::lookup("V", SourceRole::LogisticUnit, ColumnSpec::from("V"));
        let field = resolver.resolve(&mapping).unwrap();

        prop_assert_eq!(field.values.len(), ids.len());
        for (id, value) in ids.iter().zip(&field.values) {
            match expected.get(id.as_str()) {
                Some(v) => prop_assert_eq!(value, &CellValue::Number(*v as f64)),
                None => prop_assert_eq!(value, &CellValue::Null),
            }
        }
        prop_assert_eq!(
            field.matched,
            ids.iter().filter(|id| expected.contains_key(id.as_str())).count()
        );
        prop_assert!(field.warnings.is_empty());
    }
}
