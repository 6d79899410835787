// ==========================================
// 整合流程端到端测试
// ==========================================
// 测试目标: 真实 xlsx 字节 → ConsolidationApi → 输出工作簿
// ==========================================


use maestro_sku_builder::api::{ApiError, ConsolidationApi};
use maestro_sku_builder::config::{ConsolidationProfile, RoleVersion, OUTPUT_FILE_NAME};
use maestro_sku_builder::domain::{
    CellValue, ColumnSpec, DiagnosticKind, HeaderRow, SheetSelector, SourceRole,
};
use maestro_sku_builder::i18n::set_locale;
use maestro_sku_builder::importer::{
    CalamineWorkbookReader, ConsolidationError, ConsolidationRequest, Upload, WorkbookParser,
};
use maestro_sku_builder::logging;
use test_helpers::*;

fn api() -> ConsolidationApi {
    ConsolidationApi::new(ConsolidationProfile::default())
}

fn consolidation_error(err: ApiError) -> ConsolidationError {
    match err {
        ApiError::ConsolidationFailed(inner) => inner,
        other => panic!("意外错误: {:?}", other),
    }
}

#[test]
fn test_full_consolidation() {
    logging::init_test();

    let response = api().consolidate(full_request()).unwrap();
    let table = &response.output.table;

    assert_eq!(response.file_name, OUTPUT_FILE_NAME);
    assert_eq!(
        table.columns,
        vec![
            "CodigoLocal",
            "Descripcion",
            "Mercado",
            "ABC",
            "Pack Size (UxC)",
            "Bottle size",
            "DispatchToReceiveLeadTime",
            "OrderToReceiveLeadTime",
            "OriginWarehouse",
            "DestinationWarehouse",
        ]
    );
    assert_eq!(
        table.column("CodigoLocal").unwrap(),
        vec![CellValue::from("A1"), CellValue::from("A2"), CellValue::from("A3")]
    );
    assert_eq!(
        table.column("Descripcion").unwrap(),
        vec![CellValue::from("Coffee"), CellValue::from("Tea"), CellValue::Null]
    );
    assert_eq!(table.column("ABC").unwrap(), vec![CellValue::Number(0.0); 3]);
    assert_eq!(
        table.column("Bottle size").unwrap(),
        vec![CellValue::Number(50.0), CellValue::Null, CellValue::Null]
    );
    assert_eq!(
        table.column("DestinationWarehouse").unwrap(),
        vec![CellValue::from("CD Norte"), CellValue::Null, CellValue::from("CD Centro")]
    );

    // 变换失败仅 A2 一条
    assert_eq!(response.output.warnings.len(), 1);
    assert_eq!(response.output.warnings[0].identifier, "A2");
    assert_eq!(response.output.warnings[0].destination, "Bottle size");
}

#[test]
fn test_output_workbook_reads_back() {
    let response = api().consolidate(full_request()).unwrap();

    let raw = CalamineWorkbookReader
        .read_sheet(
            &response.file_name,
            &response.bytes,
            &SheetSelector::Name("Maestro".to_string()),
        )
        .unwrap();
    let table = raw.into_table(0);

    assert_eq!(table.columns, response.output.table.columns);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows[0][1], CellValue::from("Coffee"));
    assert_eq!(table.rows[0][5], CellValue::Number(50.0));
    // 空值留空
    assert_eq!(table.rows[2][1], CellValue::Null);
}

#[test]
fn test_ship_to_preferred_over_shipping() {
    let mut request = full_request();
    request.sources.push(ship_to_upload());

    let response = api().consolidate(request).unwrap();
    assert_eq!(
        response.output.table.column("DestinationWarehouse").unwrap(),
        vec![CellValue::from("Bodega Cliente"), CellValue::Null, CellValue::Null]
    );
    // 发运表仍用于其余列
    assert_eq!(
        response.output.table.column("OriginWarehouse").unwrap()[0],
        CellValue::from("CD Sur")
    );
}

#[test]
fn test_missing_shipping_source() {
    let mut request = full_request();
    request.sources.retain(|u| !u.file_name.contains("Shipping"));

    let err = consolidation_error(api().consolidate(request).unwrap_err());
    assert_eq!(
        err,
        ConsolidationError::MissingSource {
            role: SourceRole::Shipping,
            accepted: vec![SourceRole::Shipping],
        }
    );
}

#[test]
fn test_ambiguous_consumer_units() {
    let mut request = full_request();
    request.sources.push(consumer_units_upload("CU_Recipients.xlsx"));

    let err = consolidation_error(api().consolidate(request).unwrap_err());
    assert_eq!(
        err,
        ConsolidationError::AmbiguousSource {
            role: SourceRole::ConsumerUnit,
            files: vec!["ConsumerUnits.xlsx".to_string(), "CU_Recipients.xlsx".to_string()],
        }
    );
}

#[test]
fn test_master_single_sheet_fallback() {
    let mut request = full_request();
    request.master = Some(Upload::new(
        "catalogo.xlsx",
        workbook("Hoja1", &[&["Código SKU"], &["A1"], &["A2"]]),
    ));

    let response = api().consolidate(request).unwrap();
    assert_eq!(response.output.summary.total_rows, 2);
    assert_eq!(response.output.summary.master_file, "catalogo.xlsx");
}

#[test]
fn test_master_without_maestro_sheet() {
    let mut request = full_request();
    request.master = Some(Upload::new(
        "catalogo.xlsx",
        multi_sheet_workbook(&[
            ("Hoja1", &[&["SKU Código"]]),
            ("Hoja2", &[&["SKU Código"]]),
        ]),
    ));

    match consolidation_error(api().consolidate(request).unwrap_err()) {
        ConsolidationError::SheetNotFound { available, .. } => {
            assert_eq!(available, vec!["Hoja1".to_string(), "Hoja2".to_string()]);
        }
        other => panic!("意外错误: {:?}", other),
    }
}

#[test]
fn test_header_row_override_per_role() {
    let mut request = full_request();
    // 旧版发运导出: 表头在第 1 行
    request.sources.retain(|u| !u.file_name.contains("Shipping"));
    request.sources.push(Upload::new(
        "LogisticUnits_Shipping_old.xlsx",
        workbook(
            "Export",
            &[
                &[
                    "ERPID",
                    "DispatchToReceiveLeadTime",
                    "OrderToReceiveLeadTime",
                    "InitiatorWarehouseName",
                    "RecipientWarehouseName",
                ],
                &["A2", "9", "11", "CD Oeste", "CD Este"],
            ],
        ),
    ));

    // 默认表头行读不到键列
    let err = api().consolidate(request.clone()).unwrap_err();
    assert_eq!(err.code(), "COLUMN_NOT_FOUND");

    request.header_rows.insert(SourceRole::Shipping, HeaderRow::Fixed(0));
    let response = api().consolidate(request.clone()).unwrap();
    assert_eq!(
        response.output.table.column("DispatchToReceiveLeadTime").unwrap(),
        vec![CellValue::Null, CellValue::Number(9.0), CellValue::Null]
    );

    // 自动探测同样可用
    request
        .header_rows
        .insert(SourceRole::Shipping, HeaderRow::Detect { max_scan: 5 });
    let response = api().consolidate(request).unwrap();
    assert_eq!(
        response.output.table.column("OriginWarehouse").unwrap()[1],
        CellValue::from("CD Oeste")
    );
}

#[test]
fn test_export_version_overrides() {
    let mut profile = ConsolidationProfile::default();
    for role in profile.roles.iter_mut().filter(|r| r.role == SourceRole::Shipping) {
        role.versions.insert(
            "2023".to_string(),
            RoleVersion {
                header_row: Some(HeaderRow::Fixed(2)),
                key_column: Some(ColumnSpec::from("ItemCode")),
            },
        );
    }

    let mut request = full_request();
    request.sources.retain(|u| !u.file_name.contains("Shipping"));
    request.sources.push(Upload::new(
        "Shipping_2023.xlsx",
        workbook(
            "Export",
            &[
                &[EXPORT_TITLE],
                &["generado 2023"],
                &[
                    "ItemCode",
                    "DispatchToReceiveLeadTime",
                    "OrderToReceiveLeadTime",
                    "InitiatorWarehouseName",
                    "RecipientWarehouseName",
                ],
                &["A3", "7", "8", "CD Sur", "CD Norte"],
            ],
        ),
    ));
    request.export_version = Some("2023".to_string());

    let response = ConsolidationApi::new(profile).consolidate(request).unwrap();
    assert_eq!(
        response.output.table.column("OrderToReceiveLeadTime").unwrap(),
        vec![CellValue::Null, CellValue::Null, CellValue::Number(8.0)]
    );
}

#[test]
fn test_unreadable_source() {
    let mut request = full_request();
    request.sources[0] = Upload::new("LogisticUnits.xlsx", b"not a zip".to_vec());

    let err = api().consolidate(request).unwrap_err();
    assert_eq!(err.code(), "UNREADABLE_WORKBOOK");
}

#[test]
fn test_diagnostics_reported() {
    let mut request = full_request();
    request.sources.push(Upload::new("notas.xlsx", workbook("S", &[&["x"]])));
    request.sources.push(Upload::new("Glosario.xlsx", workbook("S", &[&["x"]])));

    let response = api().consolidate(request).unwrap();
    let diagnostics = &response.output.diagnostics;

    let unclassified = diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::UnclassifiedFile)
        .unwrap();
    assert_eq!(unclassified.file.as_deref(), Some("notas.xlsx"));

    let ignored = diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::IgnoredSource)
        .unwrap();
    assert_eq!(ignored.file.as_deref(), Some("Glosario.xlsx"));
}

#[test]
fn test_report_json() {
    let response = api().consolidate(full_request()).unwrap();
    let json = response.report(10).to_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["total_rows"], 3);
    assert_eq!(value["preview"].as_array().unwrap().len(), 3);
    assert_eq!(value["warnings"][0]["identifier"], "A2");
    assert!(value["summary"]["run_id"].as_str().unwrap().len() > 10);
}

#[test]
fn test_incomplete_upload_message_english() {
    let request = ConsolidationRequest {
        master: Some(master_upload()),
        ..Default::default()
    };
    let err = api().consolidate(request).unwrap_err();
    assert_eq!(err.code(), "INCOMPLETE_UPLOAD");

    set_locale("en");
    assert!(err.user_message().contains("at least one source workbook"));
    set_locale("es");
}

#[test]
fn test_pipeline_diagnostics_with_counts() {
    let mut request = full_request();
    request.master = Some(Upload::new(
        "Maestro.xlsx",
        workbook(
            "Maestro",
            &[&["SKU Código", "Nombre"], &["A1", "x"], &["", "sin código"], &["A2", "z"]],
        ),
    ));
    request.sources[0] = Upload::new(
        "LogisticUnits_general.xlsx",
        workbook(
            "Export",
            &[
                &[EXPORT_TITLE],
                &[
                    "PR.LogistU.ERPID",
                    "PR.LogistU.MyOwnPortfolio",
                    "PR.LogistU.NumberOfConsumerUnit",
                ],
                &["A1", "Coffee", "6"],
                &["A1", "Decaf", "6"],
                &["A2", "Tea", "12"],
            ],
        ),
    );

    let response = api().consolidate(request).unwrap();
    let output = &response.output;
    let of_kind = |kind: DiagnosticKind| {
        let found: Vec<_> = output.diagnostics.iter().filter(|d| d.kind == kind).collect();
        assert_eq!(found.len(), 1, "{:?}", kind);
        found[0].clone()
    };

    let blank = of_kind(DiagnosticKind::BlankIdentifiers);
    assert_eq!(blank.file.as_deref(), Some("Maestro.xlsx"));
    assert_eq!(blank.count, Some(1));

    let duplicates = of_kind(DiagnosticKind::DuplicateKeys);
    assert_eq!(duplicates.file.as_deref(), Some("LogisticUnits_general.xlsx"));
    assert_eq!(duplicates.count, Some(1));

    let overlap = of_kind(DiagnosticKind::OverlappingRules);
    assert_eq!(overlap.file.as_deref(), Some("LogisticUnits_general.xlsx"));

    let optional = of_kind(DiagnosticKind::OptionalColumnMissing);
    assert_eq!(optional.file.as_deref(), Some("LogisticUnits_general.xlsx"));

    // 重复键保留最后一条；缺失的可选列整列为空
    assert_eq!(
        output.table.column("Descripcion").unwrap(),
        vec![CellValue::from("Decaf"), CellValue::from("Tea")]
    );
    assert_eq!(
        output.table.column("Bottle size").unwrap(),
        vec![CellValue::Null, CellValue::Null]
    );
}

#[test]
fn test_long_text_codes_stay_distinct() {
    let mut request = full_request();
    request.master = Some(Upload::new(
        "Maestro.xlsx",
        workbook(
            "Maestro",
            &[
                &["SKU Código"],
                &["12345678901234567891"],
                &["12345678901234567892"],
            ],
        ),
    ));
    request.sources[0] = Upload::new(
        "LogisticUnits.xlsx",
        workbook(
            "Export",
            &[
                &[EXPORT_TITLE],
                &[
                    "PR.LogistU.ERPID",
                    "PR.LogistU.MyOwnPortfolio",
                    "PR.LogistU.NumberOfConsumerUnit",
                ],
                &["12345678901234567891", "Coffee", "6"],
            ],
        ),
    );

    let response = api().consolidate(request).unwrap();
    let table = &response.output.table;
    assert_eq!(
        table.column("CodigoLocal").unwrap(),
        vec![
            CellValue::from("12345678901234567891"),
            CellValue::from("12345678901234567892"),
        ]
    );
    assert_eq!(
        table.column("Descripcion").unwrap(),
        vec![CellValue::from("Coffee"), CellValue::Null]
    );
}
