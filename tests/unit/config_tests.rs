//! Unit tests for source configuration

use crate::common::TestFixture;
use std::fs;
use std::time::Duration;
use tabsync::config::{HeaderCapitalization, SourceFormat};
use tabsync::loaders::{ColumnOperator, Divide};
use tabsync::{RowComparison, SourceConfig, TabsyncError};

#[test]
fn test_defaults() {
    let config = SourceConfig::default();
    assert_eq!(config.page_size, tabsync::DEFAULT_PAGE_SIZE);
    assert_eq!(config.suppression_window_ms, 500);
    assert!(!config.trailing_pass);
    assert!(config.create_root);
    assert_eq!(config.row_comparison, RowComparison::ValuesAndDisplay);
    assert_eq!(config.header_capitalization, HeaderCapitalization::Original);
}

#[test]
fn test_format_parse_and_inference() {
    assert_eq!(SourceFormat::parse("JSON").unwrap(), SourceFormat::Json);
    assert_eq!(SourceFormat::parse("dir").unwrap(), SourceFormat::Directory);
    assert!(SourceFormat::parse("parquet").is_err());

    let fixture = TestFixture::new().unwrap();
    fixture.create_raw("t.xml", "<T/>").unwrap();
    let resolved = fixture.config("t.xml").resolve().unwrap();
    assert_eq!(resolved.format, SourceFormat::Xml);

    let resolved = fixture.config(".").resolve().unwrap();
    assert_eq!(resolved.format, SourceFormat::Directory);
}

#[test]
fn test_unknown_extension_needs_explicit_format() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_raw("table.dat", "a,b\n1,2\n").unwrap();

    let err = fixture.config("table.dat").resolve().unwrap_err();
    assert!(matches!(err, TabsyncError::Config { .. }));

    let mut config = fixture.config("table.dat");
    config.format = Some(SourceFormat::Csv);
    // An explicit format appends its extension when the name lacks it
    assert!(matches!(
        config.resolve(),
        Err(TabsyncError::SourceNotFound { .. })
    ));
}

#[test]
fn test_extension_is_not_appended_twice() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_raw("table.json", "{}").unwrap();

    let mut config = fixture.config("table.json");
    config.format = Some(SourceFormat::Json);
    assert_eq!(config.resolve().unwrap().path, path);
}

#[test]
fn test_config_file_round_trip_fields() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.root().join("source.json");
    fs::write(
        &path,
        r#"{
            "root": "/srv/tables",
            "file": "inventory",
            "format": "csv",
            "delimiter": ";",
            "header_capitalization": "titlecase",
            "suppression_window_ms": 1500,
            "row_comparison": "values_only"
        }"#,
    )
    .unwrap();

    let config = SourceConfig::from_json_file(&path).unwrap();
    assert_eq!(config.format, Some(SourceFormat::Csv));
    assert_eq!(config.delimiter_char().unwrap(), Some(';'));
    assert_eq!(config.header_capitalization, HeaderCapitalization::Titlecase);

    let options = config.sync_options();
    assert_eq!(options.suppression_window, Duration::from_millis(1500));
    assert_eq!(options.row_comparison, RowComparison::ValuesOnly);
}

#[test]
fn test_invalid_config_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_raw("bad.json", "{ nope").unwrap();
    assert!(matches!(
        SourceConfig::from_json_file(&path),
        Err(TabsyncError::Config { .. })
    ));
    assert!(SourceConfig::from_json_file(fixture.root().join("absent.json")).is_err());
}

#[test]
fn test_operators_from_config_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw(
            "ops.json",
            r#"{
                "file": "usage.csv",
                "operators": [
                    { "op": "divide", "first_column": "bytes", "second_column": "seconds",
                      "column_name": "rate", "modifier": 8 }
                ]
            }"#,
        )
        .unwrap();

    let config = SourceConfig::from_json_file(&path).unwrap();
    assert_eq!(
        config.operators,
        vec![ColumnOperator::Divide(
            Divide::new("bytes", "seconds", "rate").with_modifier(8.0)
        )]
    );
    assert!(SourceConfig::default().operators.is_empty());
}
