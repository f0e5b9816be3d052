//! Command-line interface for tabsync

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tabsync")]
#[command(about = "Serve a flat-file dataset as a live, paged row table")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory that file names are resolved against
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// JSON file with default source settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// How a file is read
#[derive(Args, Debug, Clone, Default)]
pub struct LoadOptions {
    /// Format: "csv", "json", "xml" or "directory" (inferred when omitted)
    #[arg(long)]
    pub format: Option<String>,

    /// CSV delimiter (detected from the header when omitted)
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Header capitalization: "original", "uppercase", "lowercase" or "titlecase"
    #[arg(long)]
    pub header_capitalization: Option<String>,

    /// List sub-directories too (directory format)
    #[arg(long)]
    pub recursive: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// File name relative to the root, or a directory
    pub file: String,

    #[command(flatten)]
    pub load: LoadOptions,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the columns and every page of a source
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Rows per page (must be > 0)
        #[arg(long, value_parser = validate_page_size)]
        page_size: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Follow a source and print every row operation until Ctrl+C
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Suppression window between two applied changes, in milliseconds
        #[arg(long)]
        window_ms: Option<u64>,

        /// Run one follow-up pass for changes suppressed by the window
        #[arg(long)]
        trailing: bool,

        /// Ignore changes that only touch display values
        #[arg(long)]
        ignore_display: bool,

        /// Print operations as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Compare two files read with the same options
    Diff {
        /// Old file
        old: String,

        /// New file
        new: String,

        #[command(flatten)]
        load: LoadOptions,

        /// Ignore changes that only touch display values
        #[arg(long)]
        ignore_display: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Validate that page size is greater than 0
fn validate_page_size(s: &str) -> Result<usize, String> {
    let page_size: usize = s
        .parse()
        .map_err(|_| format!("Invalid page size: '{}'. Must be a positive integer.", s))?;

    if page_size == 0 {
        return Err("Page size must be greater than 0".to_string());
    }

    Ok(page_size)
}
