//! Output formatting utilities

use crate::differ::{Delta, SchemaChanges};
use crate::error::Result;
use crate::model::{Row, Schema};
use crate::pager::Page;
use crate::sink::SinkOperation;
use crate::sync::PassReport;

/// Pretty printer for tabsync output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the column list of a source
    pub fn print_columns(source: &str, schema: &Schema) {
        println!("📋 Source: {}", source);
        if schema.is_empty() {
            println!("└─ No columns");
            return;
        }
        println!("└─ Columns: {}", schema.len());
        for (i, column) in schema.columns().iter().enumerate() {
            let prefix = if i == schema.len() - 1 { "   └─" } else { "   ├─" };
            println!("{} {} ({})", prefix, column.name, column.kind);
        }
    }

    /// Print one page of rows
    pub fn print_page(number: usize, page: &Page) {
        let more = if page.has_more { ", more follow" } else { "" };
        println!("📄 Page {}: {} rows{}", number, page.len(), more);
        for (i, row) in page.rows.iter().enumerate() {
            let prefix = if i == page.len() - 1 { "└─" } else { "├─" };
            println!("{} {}", prefix, format_row(row));
        }
    }

    /// Print a single sink operation as it happens
    pub fn print_operation(operation: &SinkOperation) {
        match operation {
            SinkOperation::Add { row } => println!("➕ {}", format_row(row)),
            SinkOperation::Replace { row } => println!("✏️  {}", format_row(row)),
            SinkOperation::Remove { key } => println!("➖ [{}]", key),
        }
    }

    /// Print the summary of an applied pass
    pub fn print_pass_report(report: &PassReport) {
        println!(
            "🔄 Pass applied: {} added, {} updated, {} removed",
            report.added, report.updated, report.removed
        );
        if let Some(changes) = &report.schema_changes {
            println!("├─ ❌ Schema: CHANGED ({})", changes);
        }
        if report.sink_failures > 0 {
            println!("└─ ⚠️  Sink failures: {}", report.sink_failures);
        }
    }

    /// Print the result of comparing two files
    pub fn print_diff(old: &str, new: &str, delta: &Delta, schema_changes: &SchemaChanges) {
        println!("🔍 Diff Results: {} → {}", old, new);

        if schema_changes.has_changes() {
            println!("├─ ❌ Schema: CHANGED");
            Self::print_schema_changes(schema_changes, "│  ");
        } else {
            println!("├─ ✅ Schema: unchanged");
        }

        if delta.is_empty() {
            println!("└─ ✅ Rows: unchanged");
            return;
        }

        println!("└─ ❌ Rows changed: {}", delta.total_changes());
        Self::print_rows("   ├─ Added", &delta.added);
        Self::print_rows("   ├─ Updated", &delta.updated);
        Self::print_rows("   └─ Removed", &delta.removed);
    }

    fn print_rows(label: &str, rows: &[Row]) {
        println!("{}: {}", label, rows.len());
        for row in rows.iter().take(3) {
            println!("   │  • {}", format_row(row));
        }
        if rows.len() > 3 {
            println!("   │  ... and {} more", rows.len() - 3);
        }
    }

    fn print_schema_changes(schema_changes: &SchemaChanges, prefix: &str) {
        if let Some(order_change) = &schema_changes.column_order {
            println!("{}├─ Column order changed", prefix);
            println!("{}│  ├─ Before: [{}]", prefix, order_change.before.join(", "));
            println!("{}│  └─ After:  [{}]", prefix, order_change.after.join(", "));
        }

        for addition in &schema_changes.columns_added {
            println!("{}├─ Added: {} ({})", prefix, addition.name, addition.kind);
        }

        for removal in &schema_changes.columns_removed {
            println!("{}├─ Removed: {} ({})", prefix, removal.name, removal.kind);
        }

        for rename in &schema_changes.columns_renamed {
            println!("{}├─ Renamed: {} → {}", prefix, rename.from, rename.to);
        }

        for kind_change in &schema_changes.kind_changes {
            println!(
                "{}└─ {}: {} → {}",
                prefix, kind_change.column, kind_change.from, kind_change.to
            );
        }
    }
}

/// `[key] a | b | c`, using display strings where present
pub fn format_row(row: &Row) -> String {
    let cells: Vec<String> = row.cells().iter().map(|c| c.display_text()).collect();
    format!("[{}] {}", row.key(), cells.join(" | "))
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// One compact line per operation, for streaming output
    pub fn format_operation(operation: &SinkOperation) -> Result<String> {
        operation.to_json()
    }

    pub fn format_page(number: usize, page: &Page) -> Result<String> {
        let json = serde_json::json!({
            "page": number,
            "has_more": page.has_more,
            "rows": page.rows,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_diff(delta: &Delta, schema_changes: &SchemaChanges) -> Result<String> {
        let json = serde_json::json!({
            "schema_changed": schema_changes.has_changes(),
            "schema_changes": schema_changes,
            "rows_changed": delta.total_changes(),
            "added": delta.added,
            "updated": delta.updated,
            "removed": delta.removed.iter().map(|r| r.key()).collect::<Vec<_>>(),
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
