//! Integration tests for the change synchronizer

use crate::common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tabsync::sink::CallbackSink;
use tabsync::{
    ChangeSynchronizer, PassOutcome, RecordingSink, RowComparison, SinkOperation, SyncOptions,
    TabsyncError,
};

fn synchronizer(loads: Vec<Result<tabsync::Snapshot, String>>) -> ChangeSynchronizer {
    let sync = ChangeSynchronizer::new(Box::new(ScriptedLoader::new(loads)), SyncOptions::default());
    sync.initial_load().unwrap();
    sync
}

fn describe(ops: &[SinkOperation]) -> Vec<String> {
    ops.iter()
        .map(|op| match op {
            SinkOperation::Add { row } => format!("add {}", row.key()),
            SinkOperation::Replace { row } => format!("replace {}", row.key()),
            SinkOperation::Remove { key } => format!("remove {}", key),
        })
        .collect()
}

#[test]
fn test_removed_then_updated_then_added() {
    let sync = synchronizer(vec![
        Ok(table(&[("1", "a"), ("2", "b"), ("3", "c")])),
        Ok(table(&[("2", "B"), ("4", "d"), ("3", "c")])),
    ]);

    let mut sink = RecordingSink::new();
    sync.handle_notification(&notification(0), &mut sink);

    assert_eq!(
        describe(&sink.operations()),
        vec!["remove 1", "replace 2", "add 4"]
    );
}

#[test]
fn test_unchanged_reload_sends_nothing() {
    let sync = synchronizer(vec![Ok(table(&[("1", "a")])), Ok(table(&[("1", "a")]))]);

    let mut sink = RecordingSink::new();
    match sync.handle_notification(&notification(0), &mut sink) {
        PassOutcome::Applied(report) => {
            assert_eq!(report.total_changes(), 0);
            assert!(!report.schema_changed());
        }
        other => panic!("Expected applied pass, got {:?}", other),
    }
    assert!(sink.is_empty());
}

#[test]
fn test_sink_failure_still_installs_snapshot() {
    let sync = synchronizer(vec![
        Ok(table(&[("1", "a"), ("2", "b")])),
        Ok(table(&[("2", "c"), ("3", "d")])),
    ]);

    let seen = RecordingSink::new();
    let mut log = seen.clone();
    let mut sink = CallbackSink::new(move |op: SinkOperation| {
        let key = op.key().to_string();
        match &op {
            SinkOperation::Add { row } => tabsync::UpdateSink::add_row(&mut log, row)?,
            SinkOperation::Replace { row } => tabsync::UpdateSink::replace_row(&mut log, row)?,
            SinkOperation::Remove { key } => tabsync::UpdateSink::remove_row(&mut log, key)?,
        }
        if key == "2" {
            return Err(TabsyncError::sink("rejected"));
        }
        Ok(())
    });

    let outcome = sync.handle_notification(&notification(0), &mut sink);

    match outcome {
        PassOutcome::Applied(report) => assert_eq!(report.sink_failures, 1),
        other => panic!("Expected applied pass, got {:?}", other),
    }
    // The add after the failing replace was still attempted
    assert_eq!(describe(&seen.operations()), vec!["remove 1", "replace 2", "add 3"]);

    let keys: Vec<String> = sync
        .snapshot()
        .rows()
        .iter()
        .map(|r| r.key().to_string())
        .collect();
    assert_eq!(keys, vec!["2", "3"]);
}

#[test]
fn test_out_of_order_notification_is_suppressed() {
    let sync = synchronizer(vec![
        Ok(table(&[("1", "a")])),
        Ok(table(&[("1", "b")])),
        Ok(table(&[("1", "c")])),
    ]);

    let mut sink = RecordingSink::new();
    assert!(sync.handle_notification(&notification(1000), &mut sink).is_applied());
    assert_eq!(
        sync.handle_notification(&notification(0), &mut sink),
        PassOutcome::Suppressed
    );
    assert!(sync.handle_notification(&notification(1500), &mut sink).is_applied());
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_values_only_policy_ignores_display_edits() {
    use tabsync::{Cell, Column, ColumnKind, Row, Schema, Snapshot};

    let schema = Schema::new(vec![Column::new("n", ColumnKind::Int)]);
    let before = Snapshot::new(
        schema.clone(),
        vec![Row::new("1", vec![Cell::with_display(5i64, Some("5".into()))])],
    );
    let after = Snapshot::new(
        schema,
        vec![Row::new("1", vec![Cell::with_display(5i64, Some("five".into()))])],
    );

    let sync = ChangeSynchronizer::new(
        Box::new(ScriptedLoader::new(vec![Ok(before), Ok(after)])),
        SyncOptions {
            row_comparison: RowComparison::ValuesOnly,
            ..SyncOptions::default()
        },
    );
    sync.initial_load().unwrap();

    let mut sink = RecordingSink::new();
    assert!(sync.handle_notification(&notification(0), &mut sink).is_applied());
    assert!(sink.is_empty());
}

#[test]
fn test_passes_are_mutually_exclusive() {
    let loads = (0..9)
        .map(|i| {
            let value = i.to_string();
            Ok(table(&[("1", value.as_str())]))
        })
        .collect();
    let loader = Arc::new(ScriptedLoader::new(loads).with_delay(Duration::from_millis(20)));
    let sync = Arc::new(ChangeSynchronizer::new(
        Box::new(SharedLoader(Arc::clone(&loader))),
        SyncOptions::default(),
    ));
    sync.initial_load().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sync = Arc::clone(&sync);
            std::thread::spawn(move || {
                let mut sink = RecordingSink::new();
                sync.resync(&mut sink)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_applied());
    }

    assert_eq!(loader.calls.load(Ordering::SeqCst), 9);
    assert_eq!(loader.max_active.load(Ordering::SeqCst), 1);
}
