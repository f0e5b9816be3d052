//! Live update tests against the real filesystem watcher

use crate::common::*;
use std::fs;
use std::time::{Duration, SystemTime};
use tabsync::{DataSource, RecordingSink, SinkOperation};

#[test]
fn test_file_change_is_pushed_to_sink() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("fruit.csv", &sample_data::keyed_csv_data())
        .unwrap();

    let mut config = fixture.config("fruit.csv");
    // Every event is applied; repeated events for one write produce empty passes
    config.suppression_window_ms = 0;
    let mut source = DataSource::open(config).unwrap();

    let sink = RecordingSink::new();
    source.start_updates(Box::new(sink.clone())).unwrap();
    assert!(source.is_updating());

    fixture
        .replace_atomically("fruit.csv", "id::key,name,price::double\n1,Apple,1.50\n2,Banana,0.80\n3,Cherry,2.00\n")
        .unwrap();

    assert!(wait_for(Duration::from_secs(10), || !sink.is_empty()));
    source.stop_updates();
    assert!(!source.is_updating());

    let ops = sink.operations();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], SinkOperation::Replace { row } if row.key() == "2"));
}

#[test]
fn test_unrelated_files_are_ignored() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("fruit.csv", &sample_data::keyed_csv_data())
        .unwrap();

    let mut config = fixture.config("fruit.csv");
    config.suppression_window_ms = 0;
    let mut source = DataSource::open(config).unwrap();

    let sink = RecordingSink::new();
    source.start_updates(Box::new(sink.clone())).unwrap();

    fixture
        .create_csv("other.csv", &sample_data::updated_keyed_csv_data())
        .unwrap();
    std::thread::sleep(Duration::from_millis(500));

    source.stop_updates();
    assert!(sink.is_empty());
    assert_eq!(source.snapshot().len(), 3);
}

#[test]
fn test_stop_updates_is_idempotent_and_restartable() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("fruit.csv", &sample_data::keyed_csv_data())
        .unwrap();
    let mut source = DataSource::open(fixture.config("fruit.csv")).unwrap();

    source.start_updates(Box::new(RecordingSink::new())).unwrap();
    assert!(source.start_updates(Box::new(RecordingSink::new())).is_err());

    source.stop_updates();
    source.stop_updates();

    source.start_updates(Box::new(RecordingSink::new())).unwrap();
    assert!(source.is_updating());
}

fn inbox_source(fixture: &TestFixture, window_ms: u64) -> DataSource {
    let inbox = fixture.root().join("inbox");
    fs::create_dir(&inbox).unwrap();
    fs::write(inbox.join("a.txt"), "a").unwrap();

    let mut config = fixture.config("inbox");
    config.suppression_window_ms = window_ms;
    DataSource::open(config).unwrap()
}

fn has_op(sink: &RecordingSink, wanted: impl Fn(&SinkOperation) -> bool) -> bool {
    sink.operations().iter().any(wanted)
}

#[test]
fn test_directory_deletion_removes_row() {
    let fixture = TestFixture::new().unwrap();
    let mut source = inbox_source(&fixture, 0);
    assert_eq!(source.snapshot().len(), 1);

    let sink = RecordingSink::new();
    source.start_updates(Box::new(sink.clone())).unwrap();

    fs::remove_file(fixture.root().join("inbox").join("a.txt")).unwrap();

    assert!(wait_for(Duration::from_secs(10), || has_op(&sink, |op| {
        matches!(op, SinkOperation::Remove { key } if key == "a.txt")
    })));
    source.stop_updates();
    assert!(source.snapshot().is_empty());
}

#[test]
fn test_directory_picks_up_moved_in_file_with_old_mtime() {
    let fixture = TestFixture::new().unwrap();
    let mut source = inbox_source(&fixture, 500);

    let sink = RecordingSink::new();
    source.start_updates(Box::new(sink.clone())).unwrap();

    fs::write(fixture.root().join("inbox").join("b.txt"), "b").unwrap();
    assert!(wait_for(Duration::from_secs(10), || has_op(&sink, |op| {
        matches!(op, SinkOperation::Add { row } if row.key() == "b.txt")
    })));

    std::thread::sleep(Duration::from_millis(700));

    // Stage outside the watched directory with an hour-old mtime, then move in
    let staged = fixture.root().join("c.txt");
    fs::write(&staged, "c").unwrap();
    fs::File::options()
        .write(true)
        .open(&staged)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
    fs::rename(&staged, fixture.root().join("inbox").join("c.txt")).unwrap();

    assert!(wait_for(Duration::from_secs(10), || has_op(&sink, |op| {
        matches!(op, SinkOperation::Add { row } if row.key() == "c.txt")
    })));
    source.stop_updates();
    assert_eq!(source.snapshot().len(), 3);
}

#[test]
fn test_pass_reports_reach_the_sink() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("fruit.csv", &sample_data::keyed_csv_data())
        .unwrap();

    let mut config = fixture.config("fruit.csv");
    config.suppression_window_ms = 0;
    let mut source = DataSource::open(config).unwrap();

    let sink = RecordingSink::new();
    source.start_updates(Box::new(sink.clone())).unwrap();

    fixture
        .replace_atomically("fruit.csv", "id::key,name,price::double\n1,Apple,1.50\n2,Banana,0.75\n")
        .unwrap();

    assert!(wait_for(Duration::from_secs(10), || {
        sink.reports().iter().any(|r| r.removed == 1)
    }));
    source.stop_updates();
}

#[test]
fn test_write_before_start_is_caught_up() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_csv("fruit.csv", &sample_data::keyed_csv_data())
        .unwrap();
    let mut source = DataSource::open(fixture.config("fruit.csv")).unwrap();

    // Lands after open but before anything is watching
    fixture
        .replace_atomically("fruit.csv", "id::key,name,price::double\n1,Apple,1.50\n")
        .unwrap();

    let sink = RecordingSink::new();
    source.start_updates(Box::new(sink.clone())).unwrap();

    assert!(wait_for(Duration::from_secs(10), || sink.len() >= 2));
    source.stop_updates();
    assert_eq!(source.snapshot().len(), 1);
    assert!(has_op(&sink, |op| matches!(op, SinkOperation::Remove { key } if key == "3")));
}
