//! Source configuration and file-path resolution

use crate::error::{Result, TabsyncError};
use crate::loaders::ColumnOperator;
use crate::model::RowComparison;
use crate::sync::SyncOptions;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Encoding of the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
    Xml,
    Directory,
}

impl SourceFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "directory" | "dir" => Ok(Self::Directory),
            other => Err(TabsyncError::config(format!(
                "Unknown format '{}'. Use csv, json, xml or directory",
                other
            ))),
        }
    }

    /// File extension, without the dot. Directories have none.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Csv => Some("csv"),
            Self::Json => Some("json"),
            Self::Xml => Some("xml"),
            Self::Directory => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(Self::Directory);
        }
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Rewrites column names coming from a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderCapitalization {
    #[default]
    Original,
    Uppercase,
    Lowercase,
    Titlecase,
}

impl HeaderCapitalization {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "uppercase" | "upper" => Ok(Self::Uppercase),
            "lowercase" | "lower" => Ok(Self::Lowercase),
            "titlecase" | "title" => Ok(Self::Titlecase),
            other => Err(TabsyncError::config(format!(
                "Unknown header capitalization '{}'",
                other
            ))),
        }
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Original => name.to_string(),
            Self::Uppercase => name.to_uppercase(),
            Self::Lowercase => name.to_lowercase(),
            Self::Titlecase => name
                .to_lowercase()
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Everything needed to open one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub root: PathBuf,
    pub file: String,
    pub format: Option<SourceFormat>,
    pub delimiter: Option<String>,
    pub header_capitalization: HeaderCapitalization,
    pub recursive: bool,
    pub page_size: usize,
    pub suppression_window_ms: u64,
    pub trailing_pass: bool,
    pub row_comparison: RowComparison,
    pub create_root: bool,
    /// Derived columns appended after every load, in order
    pub operators: Vec<ColumnOperator>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            file: String::new(),
            format: None,
            delimiter: None,
            header_capitalization: HeaderCapitalization::default(),
            recursive: false,
            page_size: crate::DEFAULT_PAGE_SIZE,
            suppression_window_ms: crate::DEFAULT_SUPPRESSION_WINDOW_MS,
            trailing_pass: false,
            row_comparison: RowComparison::default(),
            create_root: true,
            operators: Vec::new(),
        }
    }
}

/// A config after its path has been resolved against the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub format: SourceFormat,
}

impl SourceConfig {
    pub fn new(root: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TabsyncError::config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: SourceConfig = serde_json::from_str(&content).map_err(|e| {
            TabsyncError::config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Resolve the file against the root, creating the root first when allowed
    pub fn resolve(&self) -> Result<ResolvedSource> {
        if self.file.trim().is_empty() {
            return Err(TabsyncError::config("No file name given"));
        }

        if !self.root.exists() {
            if self.create_root {
                fs::create_dir_all(&self.root)?;
                info!("Created root directory {}", self.root.display());
            } else {
                return Err(TabsyncError::config(format!(
                    "Root directory does not exist: {}",
                    self.root.display()
                )));
            }
        } else if !self.root.is_dir() {
            return Err(TabsyncError::config(format!(
                "Root is not a directory: {}",
                self.root.display()
            )));
        }

        let mut path = self.root.join(&self.file);
        if let Some(ext) = self.format.and_then(|f| f.extension()) {
            let suffix = format!(".{}", ext);
            if !self.file.to_lowercase().ends_with(&suffix) {
                path = self.root.join(format!("{}{}", self.file, suffix));
            }
        }

        if !path.exists() {
            return Err(TabsyncError::SourceNotFound { path });
        }

        let format = match self.format {
            Some(format) => format,
            None => SourceFormat::from_path(&path).ok_or_else(|| {
                TabsyncError::config(format!(
                    "Cannot infer format of {}; set it explicitly",
                    path.display()
                ))
            })?,
        };

        if format == SourceFormat::Directory && !path.is_dir() {
            return Err(TabsyncError::config(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        Ok(ResolvedSource { path, format })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            suppression_window: Duration::from_millis(self.suppression_window_ms),
            trailing_pass: self.trailing_pass,
            row_comparison: self.row_comparison,
        }
    }

    /// Explicit delimiter, if configured. Accepts `\t` and `tab` for a tab.
    pub fn delimiter_char(&self) -> Result<Option<char>> {
        let Some(raw) = self.delimiter.as_deref() else {
            return Ok(None);
        };
        match raw {
            "\\t" | "tab" | "\t" => Ok(Some('\t')),
            _ => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Some(c)),
                    _ => Err(TabsyncError::config(format!(
                        "Delimiter must be a single character, got '{}'",
                        raw
                    ))),
                }
            }
        }
    }
}
