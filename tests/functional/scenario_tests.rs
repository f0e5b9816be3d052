//! End-to-end synchronization scenarios on real files

use crate::common::*;
use tabsync::{
    CellValue, ChangeNotification, ColumnKind, DataSource, PassOutcome, RecordingSink,
    SinkOperation,
};

const INITIAL: &str = "id::key,value\n1,a\n2,b\n";

fn open(fixture: &TestFixture) -> DataSource {
    fixture.create_raw("table.csv", INITIAL).unwrap();
    DataSource::open(fixture.config("table.csv")).unwrap()
}

fn change(fixture: &TestFixture, ms: i64) -> ChangeNotification {
    ChangeNotification::new(fixture.root().join("table.csv"), at(ms))
}

fn value_of(source: &DataSource, key: &str) -> Option<String> {
    source
        .snapshot()
        .find(key)
        .and_then(|row| row.cells()[1].value().as_str().map(str::to_string))
}

#[test]
fn test_initial_load() {
    let fixture = TestFixture::new().unwrap();
    let mut source = open(&fixture);

    let columns = source.columns();
    assert_eq!(columns.names(), vec!["id", "value"]);
    assert!(columns.columns().iter().all(|c| c.kind == ColumnKind::String));

    source.prepare_fetch();
    let page = source.next_page(500);
    assert_eq!(page.len(), 2);
    assert!(!page.has_more);
    assert_eq!(page.rows[0].key(), "1");
    assert_eq!(page.rows[1].cells()[1].value(), &CellValue::from("b"));
}

#[test]
fn test_update() {
    let fixture = TestFixture::new().unwrap();
    let source = open(&fixture);

    fixture
        .replace_atomically("table.csv", "id::key,value\n1,a\n2,c\n3,d\n")
        .unwrap();
    let mut sink = RecordingSink::new();
    source
        .synchronizer()
        .handle_notification(&change(&fixture, 0), &mut sink);

    let ops = sink.operations();
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], SinkOperation::Replace { row }
        if row.key() == "2" && row.cells()[1].value() == &CellValue::from("c")));
    assert!(matches!(&ops[1], SinkOperation::Add { row }
        if row.key() == "3" && row.cells()[1].value() == &CellValue::from("d")));
}

#[test]
fn test_removal() {
    let fixture = TestFixture::new().unwrap();
    let source = open(&fixture);

    fixture
        .replace_atomically("table.csv", "id::key,value\n1,a\n")
        .unwrap();
    let mut sink = RecordingSink::new();
    source
        .synchronizer()
        .handle_notification(&change(&fixture, 0), &mut sink);

    assert_eq!(
        sink.operations(),
        vec![SinkOperation::Remove {
            key: "2".to_string()
        }]
    );
}

#[test]
fn test_parse_failure_mid_watch() {
    let fixture = TestFixture::new().unwrap();
    let mut source = open(&fixture);

    fixture
        .replace_atomically("table.csv", "id::key,value\n1,a\n1,duplicate\n")
        .unwrap();
    let mut sink = RecordingSink::new();
    let outcome = source
        .synchronizer()
        .handle_notification(&change(&fixture, 0), &mut sink);

    assert!(matches!(outcome, PassOutcome::LoadFailed { .. }));
    assert!(sink.is_empty());

    source.prepare_fetch();
    let page = source.next_page(500);
    assert_eq!(page.len(), 2);
    assert_eq!(value_of(&source, "2").as_deref(), Some("b"));
}

#[test]
fn test_debounce_coalesces_burst() {
    let fixture = TestFixture::new().unwrap();
    let source = open(&fixture);

    fixture
        .replace_atomically("table.csv", "id::key,value\n1,x\n2,b\n")
        .unwrap();
    let mut sink = RecordingSink::new();
    let first = source
        .synchronizer()
        .handle_notification(&change(&fixture, 0), &mut sink);

    fixture
        .replace_atomically("table.csv", "id::key,value\n1,y\n2,b\n")
        .unwrap();
    let second = source
        .synchronizer()
        .handle_notification(&change(&fixture, 300), &mut sink);

    assert!(first.is_applied());
    assert_eq!(second, PassOutcome::Suppressed);
    assert_eq!(sink.len(), 1);
    assert_eq!(value_of(&source, "1").as_deref(), Some("x"));

    // A notification past the window picks up the later write
    source
        .synchronizer()
        .handle_notification(&change(&fixture, 800), &mut sink);
    assert_eq!(value_of(&source, "1").as_deref(), Some("y"));
}

#[test]
fn test_schema_change_replaces_all_rows() {
    let fixture = TestFixture::new().unwrap();
    let source = open(&fixture);

    fixture
        .replace_atomically("table.csv", "id::key,value,extra::int\n1,a,1\n3,c,3\n")
        .unwrap();
    let mut sink = RecordingSink::new();
    let outcome = source
        .synchronizer()
        .handle_notification(&change(&fixture, 0), &mut sink);

    let ops = sink.operations();
    let removed: Vec<&str> = ops
        .iter()
        .take(2)
        .map(|op| match op {
            SinkOperation::Remove { key } => key.as_str(),
            other => panic!("Expected remove, got {:?}", other),
        })
        .collect();
    assert_eq!(removed, vec!["1", "2"]);
    let added: Vec<&str> = ops
        .iter()
        .skip(2)
        .map(|op| match op {
            SinkOperation::Add { row } => row.key(),
            other => panic!("Expected add, got {:?}", other),
        })
        .collect();
    assert_eq!(added, vec!["1", "3"]);

    match outcome {
        PassOutcome::Applied(report) => {
            let changes = report.schema_changes.expect("schema change reported");
            assert_eq!(changes.columns_added.len(), 1);
            assert_eq!(changes.columns_added[0].name, "extra");
        }
        other => panic!("Expected applied pass, got {:?}", other),
    }
    assert_eq!(source.columns().len(), 3);
}

#[test]
fn test_trailing_pass_catches_suppressed_write() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_raw("table.csv", INITIAL).unwrap();
    let mut config = fixture.config("table.csv");
    config.trailing_pass = true;
    let source = DataSource::open(config).unwrap();

    let mut sink = RecordingSink::new();
    fixture
        .replace_atomically("table.csv", "id::key,value\n1,x\n2,b\n")
        .unwrap();
    source
        .synchronizer()
        .handle_notification(&change(&fixture, 0), &mut sink);

    fixture
        .replace_atomically("table.csv", "id::key,value\n1,y\n2,b\n")
        .unwrap();
    source
        .synchronizer()
        .handle_notification(&change(&fixture, 100), &mut sink);
    assert_eq!(value_of(&source, "1").as_deref(), Some("x"));

    let outcome = source.synchronizer().flush_deferred(at(700), &mut sink);
    assert!(outcome.map(|o| o.is_applied()).unwrap_or(false));
    assert_eq!(value_of(&source, "1").as_deref(), Some("y"));
}
