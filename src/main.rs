// ==========================================
// Maestro SKU 整合工具 - 命令行入口
// ==========================================
// 职责: 读取文件 → 组装请求 → 调用整合 API → 写出工作簿与报告
// ==========================================

use anyhow::{Context, Result};
use clap::Parser;
use maestro_sku_builder::api::{
    ApiError, ConsolidationApi, ConsolidationResponse, DEFAULT_PREVIEW_ROWS,
};
use maestro_sku_builder::config::{load_or_default, OUTPUT_FILE_NAME};
use maestro_sku_builder::i18n::{is_supported, set_locale, t_with_args};
use maestro_sku_builder::importer::{ConsolidationRequest, Upload};
use maestro_sku_builder::{logging, HeaderRow, SourceRole};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// 将主表与 Product Cloud 导出按 SKU 整合为一个工作簿
#[derive(Parser, Debug)]
#[command(name = "maestro-sku-builder", version, about)]
struct Cli {
    /// 主表工作簿（含 "Maestro" 工作表）
    #[arg(long)]
    master: Option<PathBuf>,

    /// 源工作簿（可重复）
    #[arg(long = "source", num_args = 1..)]
    sources: Vec<PathBuf>,

    /// 输出工作簿路径
    #[arg(long, default_value = OUTPUT_FILE_NAME)]
    output: PathBuf,

    /// 整合配置（JSON）
    #[arg(long)]
    profile: Option<PathBuf>,

    /// 主表表头行（从 0 开始，或 auto / auto:N）
    #[arg(long)]
    master_header_row: Option<HeaderRow>,

    /// 按角色覆盖表头行，如 Shipping=2 或 ShipTo=auto
    #[arg(long = "header-row", value_parser = parse_role_header_row)]
    header_rows: Vec<(SourceRole, HeaderRow)>,

    /// 导出版本（选择配置中的版本覆盖项）
    #[arg(long)]
    export_version: Option<String>,

    /// 运行报告输出路径（JSON）
    #[arg(long)]
    report: Option<PathBuf>,

    /// 预览行数（0 表示不预览）
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    preview: usize,

    /// 消息语言: es / en / zh-CN
    #[arg(long, default_value = "es")]
    lang: String,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    log_json: bool,
}

fn parse_role_header_row(raw: &str) -> Result<(SourceRole, HeaderRow), String> {
    let (role, row) = raw
        .split_once('=')
        .ok_or_else(|| format!("格式应为 ROLE=N: {}", raw))?;
    Ok((role.parse()?, row.parse()?))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    set_locale(if is_supported(&cli.lang) { cli.lang.as_str() } else { "es" });
    tracing::debug!(version = maestro_sku_builder::VERSION, "{}", maestro_sku_builder::APP_NAME);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<ApiError>() {
                Some(api_err) => api_err.user_message(),
                None => format!("{:#}", err),
            };
            eprintln!("{}", t_with_args("cli.failed", &[("message", &message)]));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let profile = load_or_default(cli.profile.as_deref()).map_err(ApiError::from)?;
    let request = build_request(cli)?;

    let api = ConsolidationApi::new(profile);
    let response = api.consolidate(request)?;

    std::fs::write(&cli.output, &response.bytes)
        .with_context(|| format!("无法写入 {}", cli.output.display()))?;
    println!(
        "{}",
        t_with_args(
            "cli.output_written",
            &[
                ("path", &cli.output.display().to_string()),
                ("rows", &response.output.summary.total_rows.to_string()),
            ],
        )
    );

    print_preview(&response, cli.preview);
    print_findings(&response);

    if let Some(report_path) = &cli.report {
        let json = response.report(cli.preview.max(DEFAULT_PREVIEW_ROWS)).to_json()?;
        std::fs::write(report_path, json)
            .with_context(|| format!("无法写入 {}", report_path.display()))?;
        println!(
            "{}",
            t_with_args("cli.report_written", &[("path", &report_path.display().to_string())])
        );
    }

    Ok(())
}

fn build_request(cli: &Cli) -> Result<ConsolidationRequest> {
    let master = cli.master.as_deref().map(read_upload).transpose()?;
    let sources = cli
        .sources
        .iter()
        .map(|p| read_upload(p))
        .collect::<Result<Vec<_>>>()?;

    Ok(ConsolidationRequest {
        master,
        sources,
        master_header_row: cli.master_header_row,
        header_rows: cli.header_rows.iter().copied().collect(),
        export_version: cli.export_version.clone(),
    })
}

fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = std::fs::read(path).with_context(|| format!("无法读取 {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload::new(file_name, bytes))
}

fn print_preview(response: &ConsolidationResponse, rows: usize) {
    if rows == 0 {
        return;
    }
    let preview = response.preview(rows);
    println!(
        "{}",
        t_with_args("cli.preview", &[("count", &preview.len().to_string())])
    );
    println!("{}", response.output.table.columns.join("\t"));
    for record in preview {
        let cells: Vec<String> = std::iter::once(&record.identifier)
            .chain(record.values.iter())
            .map(|v| v.to_string())
            .collect();
        println!("{}", cells.join("\t"));
    }
}

fn print_findings(response: &ConsolidationResponse) {
    let output = &response.output;
    if !output.warnings.is_empty() {
        println!(
            "{}",
            t_with_args("cli.warnings", &[("count", &output.warnings.len().to_string())])
        );
        for warning in &output.warnings {
            println!("  - [{}] {}: {}", warning.identifier, warning.destination, warning.message);
        }
    }
    if !output.diagnostics.is_empty() {
        println!(
            "{}",
            t_with_args("cli.diagnostics", &[("count", &output.diagnostics.len().to_string())])
        );
        for diagnostic in &output.diagnostics {
            println!(
                "  - {:?} {:?} {}: {}",
                diagnostic.level,
                diagnostic.kind,
                diagnostic.file.as_deref().unwrap_or("-"),
                diagnostic.message
            );
        }
    }
}
