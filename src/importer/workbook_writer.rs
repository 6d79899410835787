// ==========================================
// Maestro SKU 整合工具 - 输出工作簿生成
// ==========================================
// 职责: 整合结果表 → 单工作表 xlsx 字节（表头加粗，空值留空）
// ==========================================

use crate::domain::consolidation::ConsolidatedTable;
use crate::domain::table::CellValue;
use crate::importer::error::ConsolidationResult;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;

/// 生成输出工作簿
///
/// # 参数
/// - table: 整合结果表
/// - sheet_name: 输出工作表名称
///
/// # 返回
/// - Ok(Vec<u8>): xlsx 字节
/// - Err(OutputWriteError): 工作表名称非法 / 超出 Excel 行列上限等
pub fn write_workbook(table: &ConsolidatedTable, sheet_name: &str) -> ConsolidationResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (row_idx, record) in table.records.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        write_cell(worksheet, row, 0, &record.identifier)?;
        for (col_idx, value) in record.values.iter().enumerate() {
            write_cell(worksheet, row, (col_idx + 1) as u16, value)?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(rows = table.row_count(), bytes = bytes.len(), "输出工作簿生成完成");
    Ok(bytes)
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
) -> ConsolidationResult<()> {
    match value {
        CellValue::Null => { /* 空值留空 */ }
        CellValue::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
        CellValue::Text(s) => {
            ws.write_string(row, col, s)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::consolidation::ConsolidatedRecord;
    use crate::domain::types::SheetSelector;
    use crate::importer::consolidation_trait::WorkbookParser;
    use crate::importer::workbook_reader::CalamineWorkbookReader;

    fn sample() -> ConsolidatedTable {
        ConsolidatedTable {
            columns: vec!["CodigoLocal".into(), "Descripcion".into(), "ABC".into()],
            records: vec![
                ConsolidatedRecord {
                    identifier: "A1".into(),
                    values: vec!["Coffee".into(), CellValue::Number(0.0)],
                },
                ConsolidatedRecord {
                    identifier: "A3".into(),
                    values: vec![CellValue::Null, CellValue::Number(0.0)],
                },
            ],
        }
    }

    #[test]
    fn test_output_reads_back() {
        let bytes = write_workbook(&sample(), "Maestro").unwrap();
        let raw = CalamineWorkbookReader
            .read_sheet("Maestro_Consolidado.xlsx", &bytes, &SheetSelector::Name("Maestro".into()))
            .unwrap();
        let table = raw.into_table(0);

        assert_eq!(table.columns, vec!["CodigoLocal", "Descripcion", "ABC"]);
        assert_eq!(
            table.rows[0],
            vec![CellValue::from("A1"), CellValue::from("Coffee"), CellValue::Number(0.0)]
        );
        assert_eq!(table.rows[1][1], CellValue::Null);
    }

    #[test]
    fn test_invalid_sheet_name() {
        let err = write_workbook(&sample(), "bad/name").unwrap_err();
        assert_eq!(err.code(), "OUTPUT_WRITE_ERROR");
    }
}
