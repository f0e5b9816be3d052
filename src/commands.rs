//! Command implementations for the tabsync CLI

use crate::cli::{Commands, LoadOptions, SourceArgs};
use crate::config::{HeaderCapitalization, SourceConfig, SourceFormat};
use crate::differ::{diff, SchemaChanges};
use crate::error::Result;
use crate::loaders;
use crate::model::RowComparison;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::sink::{CallbackSink, SinkOperation};
use crate::source::DataSource;
use crate::sync::PassReport;
use log::info;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Settings every command starts from: the config file if given, then `--root`
pub fn base_config(config_path: Option<&Path>, root: Option<&Path>) -> Result<SourceConfig> {
    let mut config = match config_path {
        Some(path) => SourceConfig::from_json_file(path)?,
        None => SourceConfig::default(),
    };
    if let Some(root) = root {
        config.root = root.to_path_buf();
    }
    Ok(config)
}

/// Overlay command-line load options onto a config
pub fn apply_load_options(config: &mut SourceConfig, options: &LoadOptions) -> Result<()> {
    if let Some(format) = &options.format {
        config.format = Some(SourceFormat::parse(format)?);
    }
    if let Some(delimiter) = &options.delimiter {
        config.delimiter = Some(delimiter.clone());
    }
    if let Some(capitalization) = &options.header_capitalization {
        config.header_capitalization = HeaderCapitalization::parse(capitalization)?;
    }
    if options.recursive {
        config.recursive = true;
    }
    Ok(())
}

fn source_config(base: &SourceConfig, args: &SourceArgs) -> Result<SourceConfig> {
    let mut config = base.clone();
    config.file = args.file.clone();
    apply_load_options(&mut config, &args.load)?;
    Ok(config)
}

/// Execute a command
pub fn execute_command(command: Commands, base: SourceConfig) -> Result<()> {
    match command {
        Commands::Show {
            source,
            page_size,
            json,
        } => show_command(&base, &source, page_size, json),
        Commands::Watch {
            source,
            window_ms,
            trailing,
            ignore_display,
            json,
        } => watch_command(&base, &source, window_ms, trailing, ignore_display, json),
        Commands::Diff {
            old,
            new,
            load,
            ignore_display,
            json,
        } => diff_command(&base, &old, &new, &load, ignore_display, json),
    }
}

/// Print columns and every page of a source
fn show_command(
    base: &SourceConfig,
    args: &SourceArgs,
    page_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut config = source_config(base, args)?;
    if let Some(page_size) = page_size {
        config.page_size = page_size;
    }

    let mut source = DataSource::open(config)?;
    let columns = source.columns();

    if json {
        println!("{}", JsonFormatter::format(&columns)?);
    } else {
        PrettyPrinter::print_columns(&args.file, &columns);
    }

    source.prepare_fetch();
    let mut number = 1;
    loop {
        let page = source.next_page(0);
        if json {
            println!("{}", JsonFormatter::format_page(number, &page)?);
        } else {
            PrettyPrinter::print_page(number, &page);
        }
        if !page.has_more {
            break;
        }
        number += 1;
    }

    Ok(())
}

/// Follow a source until Ctrl+C
fn watch_command(
    base: &SourceConfig,
    args: &SourceArgs,
    window_ms: Option<u64>,
    trailing: bool,
    ignore_display: bool,
    json: bool,
) -> Result<()> {
    let mut config = source_config(base, args)?;
    if let Some(window_ms) = window_ms {
        config.suppression_window_ms = window_ms;
    }
    if trailing {
        config.trailing_pass = true;
    }
    if ignore_display {
        config.row_comparison = RowComparison::ValuesOnly;
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("Error setting Ctrl+C handler: {}", e))?;

    let mut source = DataSource::open(config)?;
    let columns = source.columns();
    if !json {
        PrettyPrinter::print_columns(&args.file, &columns);
        println!("👀 Watching for changes (Ctrl+C to stop)");
    }

    let sink = CallbackSink::new(move |operation: SinkOperation| {
        if json {
            println!("{}", JsonFormatter::format_operation(&operation)?);
        } else {
            PrettyPrinter::print_operation(&operation);
        }
        Ok(())
    })
    .on_pass(move |report: &PassReport| {
        if !json && (report.total_changes() > 0 || report.sink_failures > 0) {
            PrettyPrinter::print_pass_report(report);
        }
    });
    source.start_updates(Box::new(sink))?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    source.stop_updates();
    info!("Stopped watching {}", args.file);
    Ok(())
}

/// Compare two files read with the same options
fn diff_command(
    base: &SourceConfig,
    old: &str,
    new: &str,
    load: &LoadOptions,
    ignore_display: bool,
    json: bool,
) -> Result<()> {
    let load_file = |file: &str| -> Result<_> {
        let mut config = base.clone();
        config.file = file.to_string();
        apply_load_options(&mut config, load)?;
        loaders::from_config(&config)?.load()
    };

    let old_snapshot = load_file(old)?;
    let new_snapshot = load_file(new)?;

    let comparison = if ignore_display {
        RowComparison::ValuesOnly
    } else {
        RowComparison::ValuesAndDisplay
    };
    let delta = diff(old_snapshot.rows(), new_snapshot.rows(), comparison);
    let schema_changes = SchemaChanges::between(old_snapshot.schema(), new_snapshot.schema());

    if json {
        println!("{}", JsonFormatter::format_diff(&delta, &schema_changes)?);
    } else {
        PrettyPrinter::print_diff(old, new, &delta, &schema_changes);
    }

    Ok(())
}
