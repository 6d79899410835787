// ==========================================
// Maestro SKU 整合工具 - 工作簿解析器实现
// ==========================================
// 阶段 1: 工作簿字节 → 原始网格 → 表
// 支持: .xlsx / .xlsm / .xls / .xlsb / .ods（按内容自动识别）
// ==========================================

use crate::domain::table::{CellValue, Table};
use crate::domain::types::SheetSelector;
use crate::importer::consolidation_trait::WorkbookParser;
use crate::importer::error::{ConsolidationError, ConsolidationResult};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

// ==========================================
// RawSheet - 原始网格
// ==========================================
// 行号为工作表绝对行号（前导空行保留），行宽一致
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub sheet_name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    /// 以第 header_row 行为列名构造表
    ///
    /// 表头以上的行丢弃；表头以下的行全部保留（含全空行）。
    /// 表头行超出网格时返回空表（无列、无行）。
    pub fn into_table(self, header_row: usize) -> Table {
        if header_row >= self.rows.len() {
            return Table::default();
        }

        let mut rows = self.rows.into_iter().skip(header_row);
        let columns: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(|cell| cell.to_string()).collect())
            .unwrap_or_default();

        Table::new(columns, rows.collect())
    }

    /// 在前 max_scan 行中查找表头行
    ///
    /// # 参数
    /// - max_scan: 最多扫描的行数
    /// - is_header_cell: 对单元格文本的判定（命中即视为表头行）
    ///
    /// # 返回
    /// - Some(row): 第一个命中的行号
    /// - None: 未找到
    pub fn detect_header_row<F>(&self, max_scan: usize, is_header_cell: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.rows.iter().take(max_scan).position(|row| {
            row.iter()
                .any(|cell| !cell.is_null() && is_header_cell(&cell.to_string()))
        })
    }
}

// ==========================================
// CalamineWorkbookReader - 工作簿解析器
// ==========================================
pub struct CalamineWorkbookReader;

impl WorkbookParser for CalamineWorkbookReader {
    fn read_sheet(
        &self,
        file_name: &str,
        bytes: &[u8],
        sheet: &SheetSelector,
    ) -> ConsolidationResult<RawSheet> {
        let unreadable = |reason: String| ConsolidationError::UnreadableWorkbook {
            file: file_name.to_string(),
            reason,
        };

        if bytes.is_empty() {
            return Err(unreadable("文件为空".to_string()));
        }

        let (sheet_name, range) =
            catch_corrupt(file_name, || open_sheet(file_name, bytes, sheet))?;

        // 还原绝对坐标: calamine 的 Range 从第一个非空单元格开始
        let (start_row, start_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let width = if range.is_empty() {
            0
        } else {
            start_col + range.width()
        };

        let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(start_row + range.height());
        rows.resize_with(if range.is_empty() { 0 } else { start_row }, || {
            vec![CellValue::Null; width]
        });

        for data_row in range.rows() {
            let mut row = vec![CellValue::Null; start_col];
            row.extend(data_row.iter().map(cell_value));
            row.resize(width, CellValue::Null);
            rows.push(row);
        }

        debug!(
            file = file_name,
            sheet = %sheet_name,
            rows = rows.len(),
            columns = width,
            "工作表读取完成"
        );

        Ok(RawSheet { sheet_name, rows })
    }
}

/// 打开工作簿（格式按内容识别）并读取选中工作表的区域
fn open_sheet(
    file_name: &str,
    bytes: &[u8],
    sheet: &SheetSelector,
) -> ConsolidationResult<(String, Range<Data>)> {
    let unreadable = |reason: String| ConsolidationError::UnreadableWorkbook {
        file: file_name.to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| unreadable(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = select_sheet(file_name, &sheet_names, sheet)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| unreadable(e.to_string()))?;
    Ok((sheet_name, range))
}

/// 损坏的容器可能令 calamine 内部 panic（如共享字符串下标越界），统一转为 UnreadableWorkbook
fn catch_corrupt<T, F>(file_name: &str, read: F) -> ConsolidationResult<T>
where
    F: FnOnce() -> ConsolidationResult<T>,
{
    panic::catch_unwind(AssertUnwindSafe(read)).unwrap_or_else(|_| {
        warn!(file = file_name, "工作簿解析时发生 panic，按损坏文件处理");
        Err(ConsolidationError::UnreadableWorkbook {
            file: file_name.to_string(),
            reason: "corrupt workbook".to_string(),
        })
    })
}

/// 按选择器确定工作表名称
fn select_sheet(
    file_name: &str,
    sheet_names: &[String],
    selector: &SheetSelector,
) -> ConsolidationResult<String> {
    let not_found = |requested: String| ConsolidationError::SheetNotFound {
        file: file_name.to_string(),
        requested,
        available: sheet_names.to_vec(),
    };

    match selector {
        SheetSelector::First => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| not_found(selector.to_string())),
        SheetSelector::Index(idx) => sheet_names
            .get(*idx)
            .cloned()
            .ok_or_else(|| not_found(selector.to_string())),
        SheetSelector::Name(name) => sheet_names
            .iter()
            .find(|s| *s == name)
            .cloned()
            .ok_or_else(|| not_found(selector.to_string())),
        SheetSelector::NamedOrSole(name) => {
            if let Some(found) = sheet_names.iter().find(|s| *s == name) {
                return Ok(found.clone());
            }
            match sheet_names {
                [only] => Ok(only.clone()),
                _ => Err(not_found(selector.to_string())),
            }
        }
    }
}

/// calamine 单元格 → 宽松类型单元格值
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from_text(s),
        Data::Bool(b) => CellValue::Text(b.to_string().to_uppercase()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sample_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Export").unwrap();
        sheet.write_string(0, 0, "LogisticUnits export").unwrap();
        sheet.write_string(1, 0, "PR.LogistU.ERPID").unwrap();
        sheet.write_string(1, 1, "PR.LogistU.Size").unwrap();
        sheet.write_string(2, 0, "A1").unwrap();
        sheet.write_number(2, 1, 5.0).unwrap();
        sheet.write_string(4, 0, "A2").unwrap();
        sheet.write_string(4, 1, "7").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_parse_with_header_offset() {
        let reader = CalamineWorkbookReader;
        let table = reader
            .parse("LogisticUnits.xlsx", &sample_workbook(), &SheetSelector::First, 1)
            .unwrap();

        assert_eq!(table.columns, vec!["PR.LogistU.ERPID", "PR.LogistU.Size"]);
        // 中间的全空行保留
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[0], vec![CellValue::Text("A1".into()), CellValue::Number(5.0)]);
        assert_eq!(table.rows[1], vec![CellValue::Null, CellValue::Null]);
        // 数字样式文本转为数字
        assert_eq!(table.rows[2][1], CellValue::Number(7.0));
    }

    #[test]
    fn test_panic_in_reader_becomes_unreadable() {
        let result: ConsolidationResult<()> =
            catch_corrupt("broken.xlsx", || panic!("index out of bounds"));
        assert_eq!(
            result.unwrap_err(),
            ConsolidationError::UnreadableWorkbook {
                file: "broken.xlsx".to_string(),
                reason: "corrupt workbook".to_string(),
            }
        );
    }

    #[test]
    fn test_byte_corrupted_workbook_never_panics() {
        let bytes = sample_workbook();
        for pos in 0..bytes.len() {
            let mut corrupted = bytes.clone();
            corrupted[pos] ^= 0xFF;
            match CalamineWorkbookReader.read_sheet("x.xlsx", &corrupted, &SheetSelector::First) {
                Ok(_) => {}
                Err(e) => assert!(
                    matches!(
                        e,
                        ConsolidationError::UnreadableWorkbook { .. }
                            | ConsolidationError::SheetNotFound { .. }
                    ),
                    "位置 {} 的意外错误: {:?}",
                    pos,
                    e
                ),
            }
        }
    }

    #[test]
    fn test_detect_header_row() {
        let reader = CalamineWorkbookReader;
        let raw = reader
            .read_sheet("x.xlsx", &sample_workbook(), &SheetSelector::First)
            .unwrap();
        assert_eq!(raw.detect_header_row(5, |c| c.ends_with("ERPID")), Some(1));
        assert_eq!(raw.detect_header_row(1, |c| c.ends_with("ERPID")), None);
    }

    #[test]
    fn test_leading_blank_rows_keep_absolute_offsets() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(2, 1, "ERPID").unwrap();
        sheet.write_string(3, 1, "A1").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = CalamineWorkbookReader
            .parse("x.xlsx", &bytes, &SheetSelector::First, 2)
            .unwrap();
        assert_eq!(table.columns, vec!["", "ERPID"]);
        assert_eq!(table.rows, vec![vec![CellValue::Null, CellValue::Text("A1".into())]]);
    }

    #[test]
    fn test_sheet_not_found_lists_available() {
        let err = CalamineWorkbookReader
            .read_sheet("x.xlsx", &sample_workbook(), &SheetSelector::Name("Maestro".into()))
            .unwrap_err();
        match err {
            ConsolidationError::SheetNotFound { available, .. } => {
                assert_eq!(available, vec!["Export".to_string()])
            }
            other => panic!("意外错误: {:?}", other),
        }
    }

    #[test]
    fn test_named_or_sole_falls_back_to_only_sheet() {
        let raw = CalamineWorkbookReader
            .read_sheet(
                "x.xlsx",
                &sample_workbook(),
                &SheetSelector::NamedOrSole("Maestro".into()),
            )
            .unwrap();
        assert_eq!(raw.sheet_name, "Export");
    }

    #[test]
    fn test_unreadable_workbook() {
        let err = CalamineWorkbookReader
            .read_sheet("roto.xlsx", b"definitely not a workbook", &SheetSelector::First)
            .unwrap_err();
        assert_eq!(err.code(), "UNREADABLE_WORKBOOK");

        let err = CalamineWorkbookReader
            .read_sheet("vacio.xlsx", &[], &SheetSelector::First)
            .unwrap_err();
        assert_eq!(err.code(), "UNREADABLE_WORKBOOK");
    }

    #[test]
    fn test_header_beyond_sheet_gives_empty_table() {
        let table = CalamineWorkbookReader
            .parse("x.xlsx", &sample_workbook(), &SheetSelector::First, 50)
            .unwrap();
        assert!(table.columns.is_empty());
        assert_eq!(table.row_count(), 0);
    }
}
