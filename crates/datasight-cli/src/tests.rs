//! CLI command tests

use std::fs;
use std::path::Path;

use clap::Parser;
use tempfile::TempDir;

use datasight_core::config::{ClientConfig, StorageConfig};
use datasight_core::{AppConfig, ToolContext};

use crate::cli::{AiArgs, ChartArgs, Cli, Commands, ReadArgs};
use crate::commands;

fn setup_test_ctx() -> (TempDir, AppConfig, ToolContext) {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        ai: ClientConfig {
            // Nothing listens on port 1
            base_url: "http://127.0.0.1:1".into(),
            api_key: Some("sk-test-123456".into()),
            max_retries: 0,
            ..Default::default()
        },
        storage: StorageConfig::new(dir.path().join("data"), dir.path().join("outputs")),
    };
    let ctx = ToolContext::new(&config);
    (dir, config, ctx)
}

fn read_args() -> ReadArgs {
    ReadArgs {
        delimiter: ",".into(),
        encoding: "utf-8".into(),
    }
}

fn bar_chart() -> ChartArgs {
    ChartArgs {
        kind: "barchart".into(),
        x: Some("city".into()),
        y: Some("sales".into()),
        agg: "sum".into(),
        ..Default::default()
    }
}

fn upload_sample(dir: &Path, ctx: &ToolContext) -> String {
    let file = dir.join("sales.csv");
    fs::write(&file, "city,sales\r\nParis,10\r\nLyon,5\r\nNice,7").unwrap();
    commands::upload_file(ctx, &file, None, &read_args())
        .unwrap()
        .file_id
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_report_command() {
    let cli = Cli::try_parse_from([
        "datasight", "report", "abc123", "-x", "city", "-y", "sales", "--ai", "--html",
    ])
    .unwrap();
    match cli.command {
        Commands::Report {
            file_id,
            analysis,
            chart,
            ai,
            html,
            ..
        } => {
            assert_eq!(file_id, "abc123");
            assert_eq!(analysis, "summary");
            assert_eq!(chart.x.as_deref(), Some("city"));
            assert!(ai && html);
        }
        _ => panic!("expected report command"),
    }
}

#[test]
fn test_parse_serve_defaults() {
    let cli = Cli::try_parse_from(["datasight", "serve", "--mcp-port", "3001"]).unwrap();
    match cli.command {
        Commands::Serve {
            port,
            host,
            mcp_port,
        } => {
            assert_eq!(port, 3000);
            assert_eq!(host, "127.0.0.1");
            assert_eq!(mcp_port, Some(3001));
        }
        _ => panic!("expected serve command"),
    }
}

// ========== Helper Tests ==========

#[test]
fn test_viz_request_needs_both_columns() {
    assert!(commands::viz_request(&ChartArgs::default()).unwrap().is_none());

    let only_x = ChartArgs {
        x: Some("city".into()),
        ..Default::default()
    };
    assert!(commands::viz_request(&only_x).is_err());

    let viz = commands::viz_request(&bar_chart()).unwrap().unwrap();
    assert_eq!(viz.x, "city");
    assert_eq!(viz.agg.as_deref(), Some("sum"));
}

#[test]
fn test_parse_figsize() {
    assert_eq!(commands::parse_figsize("10x6").unwrap(), vec![10.0, 6.0]);
    assert!(commands::parse_figsize("10").is_err());
    assert!(commands::parse_figsize("0x6").is_err());
}

#[test]
fn test_is_workbook() {
    assert!(commands::is_workbook(Path::new("book.XLSX")));
    assert!(commands::is_workbook(Path::new("sheet.ods")));
    assert!(!commands::is_workbook(Path::new("data.csv")));
}

#[test]
fn test_config_lines_mask_api_key() {
    let (_dir, config, _ctx) = setup_test_ctx();
    let lines = commands::config_lines(&config);
    let key = lines.iter().find(|(k, _)| *k == "ai.api_key").unwrap();
    assert!(!key.1.contains("test-123"));
    assert!(commands::cmd_config(&config).is_ok());
}

// ========== Command Tests ==========

#[test]
fn test_upload_normalizes_newlines() {
    let (dir, _config, ctx) = setup_test_ctx();
    let file_id = upload_sample(dir.path(), &ctx);

    let stored = fs::read_to_string(dir.path().join("data").join(format!("{}.csv", file_id))).unwrap();
    assert!(!stored.contains('\r'));
    assert!(stored.ends_with('\n'));
}

#[test]
fn test_cmd_analyze() {
    let (dir, _config, ctx) = setup_test_ctx();
    let file_id = upload_sample(dir.path(), &ctx);

    assert!(commands::cmd_analyze(&ctx, &file_id, &read_args()).is_ok());
    assert!(commands::cmd_analyze(&ctx, "missing", &read_args()).is_err());
}

#[test]
fn test_cmd_chart_writes_file() {
    let (dir, _config, ctx) = setup_test_ctx();
    let file_id = upload_sample(dir.path(), &ctx);

    assert!(commands::cmd_chart(&ctx, &file_id, &bar_chart(), &read_args()).is_ok());
    let charts: Vec<_> = fs::read_dir(dir.path().join("outputs")).unwrap().collect();
    assert!(!charts.is_empty());
}

#[test]
fn test_cmd_chart_requires_columns() {
    let (dir, _config, ctx) = setup_test_ctx();
    let file_id = upload_sample(dir.path(), &ctx);

    assert!(commands::cmd_chart(&ctx, &file_id, &ChartArgs::default(), &read_args()).is_err());
}

#[tokio::test]
async fn test_cmd_insight_falls_back() {
    let (dir, _config, ctx) = setup_test_ctx();
    let file_id = upload_sample(dir.path(), &ctx);

    let result =
        commands::cmd_insight(&ctx, &file_id, &bar_chart(), &AiArgs::default(), &read_args()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_report_with_html() {
    let (dir, _config, ctx) = setup_test_ctx();
    let file_id = upload_sample(dir.path(), &ctx);

    let result = commands::cmd_report(
        &ctx,
        &file_id,
        "summary",
        &bar_chart(),
        Some(&AiArgs::default()),
        true,
        &read_args(),
    )
    .await;
    assert!(result.is_ok());
    assert!(dir.path().join("outputs").join("reports").exists());
}

#[tokio::test]
async fn test_cmd_report_unknown_dataset_fails() {
    let (_dir, _config, ctx) = setup_test_ctx();

    let result = commands::cmd_report(
        &ctx,
        "missing",
        "summary",
        &ChartArgs::default(),
        None,
        false,
        &read_args(),
    )
    .await;
    assert!(result.is_err());
}

#[test]
fn test_report_params_rejects_half_chart() {
    let chart = ChartArgs {
        y: Some("sales".into()),
        ..Default::default()
    };
    assert!(commands::report_params("abc", "summary", &chart, None, false, &read_args()).is_err());
}
