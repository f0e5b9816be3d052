//! Functional tests for the CLI commands

use crate::common::*;
use clap::Parser;
use tabsync::cli::Cli;
use tabsync::commands::{base_config, execute_command};
use tabsync::{Result, TabsyncError};

/// Parse and run a command with the fixture as root
fn run(fixture: &TestFixture, args: &[&str]) -> Result<()> {
    let mut cmd_args = vec!["tabsync"];
    cmd_args.extend(args);

    let cli = Cli::try_parse_from(cmd_args)
        .map_err(|e| TabsyncError::invalid_input(e.to_string()))?;
    let root = cli.root.clone().unwrap_or_else(|| fixture.root().to_path_buf());
    let base = base_config(cli.config.as_deref(), Some(&root))?;
    execute_command(cli.command, base)
}

#[test]
fn test_show_csv() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("fruit.csv", &sample_data::keyed_csv_data())
        .unwrap();

    run(&fixture, &["show", "fruit.csv"]).unwrap();
    run(&fixture, &["show", "fruit", "--format", "csv", "--page-size", "1", "--json"]).unwrap();
}

#[test]
fn test_show_json_and_xml() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_json("stock.json", &sample_data::table_json())
        .unwrap();
    fixture.create_xml("flags.xml", sample_data::table_xml()).unwrap();

    run(&fixture, &["show", "stock.json", "--header-capitalization", "uppercase"]).unwrap();
    run(&fixture, &["show", "flags.xml", "--json"]).unwrap();
}

#[test]
fn test_show_missing_file_fails() {
    let fixture = TestFixture::new().unwrap();
    let err = run(&fixture, &["show", "missing.csv"]).unwrap_err();
    assert!(matches!(err, TabsyncError::SourceNotFound { .. }));
}

#[test]
fn test_show_rejects_unknown_format() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_raw("x.csv", "a,b\n").unwrap();
    let err = run(&fixture, &["show", "x.csv", "--format", "yaml"]).unwrap_err();
    assert!(matches!(err, TabsyncError::Config { .. }));
}

#[test]
fn test_diff_command() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("old.csv", &sample_data::keyed_csv_data())
        .unwrap();
    fixture
        .create_csv("new.csv", &sample_data::updated_keyed_csv_data())
        .unwrap();
    fixture
        .create_csv("wide.csv", &sample_data::schema_changed_csv_data())
        .unwrap();

    run(&fixture, &["diff", "old.csv", "new.csv"]).unwrap();
    run(&fixture, &["diff", "old.csv", "wide.csv", "--json"]).unwrap();
}

#[test]
fn test_config_file_supplies_defaults() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_raw("semi.csv", "a;b\n1;2\n").unwrap();
    let config_path = fixture
        .create_raw("tabsync.json", r#"{ "delimiter": ";", "page_size": 1 }"#)
        .unwrap();

    run(
        &fixture,
        &["--config", config_path.to_str().unwrap(), "show", "semi.csv"],
    )
    .unwrap();
}
