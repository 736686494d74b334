// ==========================================
// Sell-out 台账系统 - 命令行入口
// ==========================================
// 用法:
//   sellout-ledger [db_path] <archivo> [--cliente COD] [--formato rm|deprati] [--txt]
//
// 对指定 SQLite 数据库执行一次导入，输出 JSON 汇总或纯文本报告
// ==========================================

use sellout_ledger::api::{IngestApi, IngestResponse};
use sellout_ledger::db::{get_default_db_path, init_schema, open_sqlite_connection};
use sellout_ledger::importer::PartnerLayout;
use sellout_ledger::logging;
use std::error::Error;
use std::path::Path;

const USAGE: &str = "用法: sellout-ledger [db_path] <archivo> [--cliente COD] [--formato rm|deprati] [--txt]";

/// 命令行参数
#[derive(Debug, PartialEq)]
struct CliArgs {
    db_path: Option<String>,
    file: String,
    client_code: Option<String>,
    layout: PartnerLayout,
    as_text: bool,
}

impl CliArgs {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut client_code = None;
        let mut layout = PartnerLayout::default();
        let mut as_text = false;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--txt" => as_text = true,
                "--cliente" => {
                    let code = iter.next().ok_or_else(|| format!("--cliente 缺少参数\n{}", USAGE))?;
                    client_code = Some(code);
                }
                "--formato" => {
                    let name = iter.next().ok_or_else(|| format!("--formato 缺少参数\n{}", USAGE))?;
                    layout = PartnerLayout::by_name(&name)
                        .ok_or_else(|| format!("未知文件格式: {}\n{}", name, USAGE))?;
                }
                flag if flag.starts_with("--") => {
                    return Err(format!("未知参数: {}\n{}", flag, USAGE));
                }
                _ => positional.push(arg),
            }
        }

        let (db_path, file) = match positional.len() {
            1 => (None, positional.remove(0)),
            2 => {
                let file = positional.remove(1);
                (Some(positional.remove(0)), file)
            }
            _ => return Err(USAGE.to_string()),
        };

        Ok(Self {
            db_path,
            file,
            client_code,
            layout,
            as_text,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 初始化日志系统
    logging::init();

    let cli = CliArgs::parse(std::env::args().skip(1))?;
    let db_path = cli.db_path.clone().unwrap_or_else(get_default_db_path);

    tracing::info!(version = sellout_ledger::VERSION, db_path = %db_path, "{}", sellout_ledger::APP_NAME);

    // 幂等建表
    {
        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
    }

    let bytes = std::fs::read(&cli.file)?;
    let file_name = Path::new(&cli.file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| cli.file.clone());

    let api = IngestApi::new(db_path);
    let response = api
        .upload_with_layout(
            &bytes,
            &file_name,
            cli.client_code.as_deref(),
            cli.as_text,
            cli.layout,
        )
        .await?;

    match response {
        IngestResponse::Summary(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        IngestResponse::TextReport { file_name, content } => {
            tracing::info!(report = %file_name, "文本报告已生成");
            print!("{}", content);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_file_only() {
        let cli = CliArgs::parse(args(&["ventas.xlsx"])).unwrap();
        assert_eq!(cli.db_path, None);
        assert_eq!(cli.file, "ventas.xlsx");
        assert_eq!(cli.layout.name, "RM");
        assert!(!cli.as_text);
    }

    #[test]
    fn test_parse_full() {
        let cli = CliArgs::parse(args(&["--txt", "db.sqlite", "rm.xlsx", "--cliente", "MZCL-1"])).unwrap();
        assert_eq!(cli.db_path.as_deref(), Some("db.sqlite"));
        assert_eq!(cli.file, "rm.xlsx");
        assert_eq!(cli.client_code.as_deref(), Some("MZCL-1"));
        assert!(cli.as_text);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CliArgs::parse(args(&[])).is_err());
        assert!(CliArgs::parse(args(&["a", "b", "c"])).is_err());
        assert!(CliArgs::parse(args(&["a.xlsx", "--cliente"])).is_err());
        assert!(CliArgs::parse(args(&["a.xlsx", "--verbose"])).is_err());
        assert!(CliArgs::parse(args(&["a.xlsx", "--formato"])).is_err());
        assert!(CliArgs::parse(args(&["a.xlsx", "--formato", "fybeca"])).is_err());
    }

    #[test]
    fn test_parse_partner_layout() {
        let cli = CliArgs::parse(args(&["deprati.xlsx", "--formato", "Deprati"])).unwrap();
        assert_eq!(cli.layout.name, "DEPRATI");
        assert_eq!(cli.client_code, None);
    }
}
