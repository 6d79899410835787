// ==========================================
// Maestro SKU 整合工具 - 整合组件 Trait
// ==========================================
// 职责: 定义整合流程各阶段接口（不包含实现）
// ==========================================

use crate::domain::table::Table;
use crate::domain::types::{SheetSelector, SourceRole};
use crate::importer::error::ConsolidationResult;
use crate::importer::workbook_reader::RawSheet;

// ==========================================
// WorkbookParser Trait
// ==========================================
// 用途: 工作簿解析接口（阶段 1）
// 实现者: CalamineWorkbookReader
pub trait WorkbookParser: Send + Sync {
    /// 读取工作簿中的一个工作表为原始网格（含表头前的行）
    ///
    /// # 参数
    /// - file_name: 文件名（用于错误信息）
    /// - bytes: 工作簿原始字节
    /// - sheet: 工作表选择器
    ///
    /// # 返回
    /// - Ok(RawSheet): 原始网格（行号为工作表绝对行号）
    /// - Err: UnreadableWorkbook / SheetNotFound
    fn read_sheet(
        &self,
        file_name: &str,
        bytes: &[u8],
        sheet: &SheetSelector,
    ) -> ConsolidationResult<RawSheet>;

    /// 解析为表（第 header_row 行为列名，其上各行丢弃）
    fn parse(
        &self,
        file_name: &str,
        bytes: &[u8],
        sheet: &SheetSelector,
        header_row: usize,
    ) -> ConsolidationResult<Table> {
        Ok(self.read_sheet(file_name, bytes, sheet)?.into_table(header_row))
    }
}

// ==========================================
// ColumnNormalizer Trait
// ==========================================
// 用途: 列名标准化接口（阶段 2）
// 实现者: DefaultColumnNormalizer
pub trait ColumnNormalizer: Send + Sync {
    /// 标准化单个列名（换行 → 空格，去首尾空白）
    fn normalize_name(&self, raw: &str) -> String;

    /// 标准化整张表的列名
    ///
    /// # 要求
    /// - 幂等：normalize(normalize(t)) == normalize(t)
    /// - 不修改单元格值，不改变行/列顺序
    /// - 结果列名唯一
    fn normalize(&self, table: Table) -> Table;
}

// ==========================================
// SourceClassifier Trait
// ==========================================
// 用途: 数据源分类接口（阶段 3）
// 实现者: FilenameClassifier
pub trait SourceClassifier: Send + Sync {
    /// 按文件名判定数据源角色
    ///
    /// # 返回
    /// - Classification.role = Some: 第一个匹配的角色
    /// - Classification.role = None: 未分类（需作为诊断信息上报）
    fn classify(&self, file_name: &str) -> Classification;
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub file_name: String,
    pub role: Option<SourceRole>,
    /// 除生效角色外也匹配的角色（规则重叠）
    pub also_matched: Vec<SourceRole>,
}
