//! CSV parsing into headers, sampled rows, and per-column statistics.
//!
//! [`parse_file`] turns one file into a [`ParseResult`]; [`parse_batch`]
//! runs many files independently with partial-failure semantics. Fatal
//! per-file conditions (oversized, empty, undecodable) are typed in
//! [`ParseError`] so batch callers can match on them; recoverable oddities
//! (ragged rows, duplicate headers) become [`ParseIssue`] warnings attached
//! to the result instead.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Result, bail};
use encoding_rs::Encoding;
use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::{detect, io_utils};

/// Rows retained for downstream analysis when the caller does not override.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;
/// Default per-file size ceiling (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
/// Preview values kept per column.
const SAMPLE_VALUE_LIMIT: usize = 20;

/// Stable warning codes attached to [`ParseIssue`]s.
pub mod issue_codes {
    pub const EMPTY_HEADER: &str = "empty_header";
    pub const DUPLICATE_HEADER: &str = "duplicate_header";
    pub const COLUMN_COUNT_MISMATCH: &str = "column_count_mismatch";
    pub const EMPTY_ROW: &str = "empty_row";
}

#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Explicit delimiter; `None` engages detection.
    pub delimiter: Option<u8>,
    /// Explicit encoding label; `None` engages BOM/ASCII sniffing.
    pub encoding: Option<String>,
    pub has_header: bool,
    pub skip_empty_lines: bool,
    pub trim_whitespace: bool,
    pub sample_size: usize,
    pub max_file_size: u64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: None,
            has_header: true,
            skip_empty_lines: true,
            trim_whitespace: true,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Fatal per-file parse failures.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("'{name}' is {size} bytes which exceeds the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("'{name}' contains no data rows")]
    Empty { name: String },
    #[error("unknown encoding label '{label}'")]
    UnknownEncoding { label: String },
    #[error("'{name}' could not be decoded as {encoding}")]
    Decode { name: String, encoding: String },
    #[error("reading '{name}' failed")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in '{name}'")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// Non-fatal parse finding, always recorded and never thrown.
#[derive(Debug, Clone, Serialize)]
pub struct ParseIssue {
    pub severity: IssueSeverity,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl ParseIssue {
    fn warning(code: &'static str, message: String) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            code,
            row: None,
            column: None,
            message,
        }
    }

    fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    fn at_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }
}

/// Per-column statistics over the sampled rows, the sole input to type
/// inference.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub name: String,
    /// First few non-empty values, for previews and reasoning examples.
    pub sample_values: Vec<String>,
    /// Distinct non-empty values. Ordered set keeps downstream output stable.
    pub unique_values: BTreeSet<String>,
    pub null_count: usize,
    pub empty_count: usize,
    pub total_count: usize,
}

impl ColumnStats {
    fn new(name: String) -> Self {
        Self {
            name,
            sample_values: Vec::new(),
            unique_values: BTreeSet::new(),
            null_count: 0,
            empty_count: 0,
            total_count: 0,
        }
    }

    fn record(&mut self, cell: Option<&str>) {
        self.total_count += 1;
        match cell {
            None => self.null_count += 1,
            Some(value) if value.trim().is_empty() => {
                self.null_count += 1;
                self.empty_count += 1;
            }
            Some(value) => {
                if self.sample_values.len() < SAMPLE_VALUE_LIMIT {
                    self.sample_values.push(value.to_string());
                }
                self.unique_values.insert(value.to_string());
            }
        }
    }

    pub fn non_null_count(&self) -> usize {
        self.total_count - self.null_count
    }

    pub fn null_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.total_count as f64
        }
    }

    pub fn unique_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.unique_values.len() as f64 / self.total_count as f64
        }
    }
}

/// Output of parsing one file. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub file_name: String,
    pub headers: Vec<String>,
    /// Sampled data rows; empty cells are normalized to `None`.
    pub rows: Vec<Vec<Option<String>>>,
    /// Full data row count, including rows beyond the sample window.
    pub total_rows: usize,
    pub sampled_rows: usize,
    pub columns: Vec<ColumnStats>,
    pub issues: Vec<ParseIssue>,
    pub delimiter: u8,
    pub encoding: String,
}

impl ParseResult {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ParseIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
    }
}

/// Parses a file from disk, enforcing the configured size ceiling.
pub fn parse_file(path: &Path, config: &ParseConfig) -> Result<ParseResult, ParseError> {
    let name = file_display_name(path);
    let metadata = fs::metadata(path).map_err(|source| ParseError::Io {
        name: name.clone(),
        source,
    })?;
    if metadata.len() > config.max_file_size {
        return Err(ParseError::FileTooLarge {
            name,
            size: metadata.len(),
            limit: config.max_file_size,
        });
    }
    let bytes = fs::read(path).map_err(|source| ParseError::Io {
        name: name.clone(),
        source,
    })?;
    parse_bytes(&bytes, &name, config)
}

/// Parses an in-memory buffer. Entry point for callers that already hold the
/// file contents (uploads, tests).
pub fn parse_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &ParseConfig,
) -> Result<ParseResult, ParseError> {
    if bytes.len() as u64 > config.max_file_size {
        return Err(ParseError::FileTooLarge {
            name: file_name.to_string(),
            size: bytes.len() as u64,
            limit: config.max_file_size,
        });
    }

    let (encoding, encoding_label) = resolve_parse_encoding(bytes, config)?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ParseError::Decode {
            name: file_name.to_string(),
            encoding: encoding_label.clone(),
        });
    }

    let delimiter = config
        .delimiter
        .unwrap_or_else(|| detect::detect_delimiter(&text));

    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter);
    let mut records = reader.records();

    let mut issues = Vec::new();
    let mut headers: Option<Vec<String>> = None;

    if config.has_header {
        match records.next() {
            Some(record) => {
                let record = record.map_err(|source| ParseError::Csv {
                    name: file_name.to_string(),
                    source,
                })?;
                headers = Some(read_headers(&record, config, &mut issues));
            }
            None => {
                return Err(ParseError::Empty {
                    name: file_name.to_string(),
                });
            }
        }
    }

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut total_rows = 0usize;
    let mut stats: Vec<ColumnStats> = headers
        .as_deref()
        .map(|names| names.iter().cloned().map(ColumnStats::new).collect())
        .unwrap_or_default();

    for (index, record) in records.enumerate() {
        let record = record.map_err(|source| ParseError::Csv {
            name: file_name.to_string(),
            source,
        })?;
        // 1-based data row number for messages, past the header if present.
        let row_number = index + 1;

        let header_names = headers.get_or_insert_with(|| synthesize_headers(record.len()));
        if stats.is_empty() {
            stats = header_names.iter().cloned().map(ColumnStats::new).collect();
        }

        let cells: Vec<Option<String>> = (0..header_names.len())
            .map(|i| normalize_cell(record.get(i), config))
            .collect();

        if record.len() != header_names.len() {
            issues.push(
                ParseIssue::warning(
                    issue_codes::COLUMN_COUNT_MISMATCH,
                    format!(
                        "Row {row_number} has {} field(s) but {} column(s) are defined",
                        record.len(),
                        header_names.len()
                    ),
                )
                .at_row(row_number),
            );
        }

        if cells.iter().all(Option::is_none) {
            issues.push(
                ParseIssue::warning(issue_codes::EMPTY_ROW, format!("Row {row_number} is empty"))
                    .at_row(row_number),
            );
            if config.skip_empty_lines {
                continue;
            }
        }

        total_rows += 1;
        if rows.len() < config.sample_size {
            // Stats see the raw field so a present-but-empty cell still
            // counts toward empty_count; missing fields count as null only.
            for (i, stat) in stats.iter_mut().enumerate() {
                let field = record.get(i).map(|f| {
                    if config.trim_whitespace { f.trim() } else { f }
                });
                stat.record(field);
            }
            rows.push(cells);
        }
    }

    if total_rows == 0 {
        return Err(ParseError::Empty {
            name: file_name.to_string(),
        });
    }

    let sampled_rows = rows.len();
    Ok(ParseResult {
        file_name: file_name.to_string(),
        headers: headers.unwrap_or_default(),
        rows,
        total_rows,
        sampled_rows,
        columns: stats,
        issues,
        delimiter,
        encoding: encoding_label,
    })
}

/// One failed file inside a batch.
#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: ParseError,
}

/// Outcome of a multi-file parse: the files that succeeded plus the recorded
/// failures. At least one success is guaranteed when this is returned.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<ParseResult>,
    pub failures: Vec<BatchFailure>,
}

/// Parses each file independently. Individual failures are logged and
/// accumulated; the batch itself fails only when every file failed.
pub fn parse_batch(paths: &[PathBuf], config: &ParseConfig) -> Result<BatchOutcome> {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match parse_file(path, config) {
            Ok(result) => results.push(result),
            Err(error) => {
                warn!("Skipping {}: {error}", path.display());
                failures.push(BatchFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }
    if results.is_empty() && !failures.is_empty() {
        bail!(
            "All {} input file(s) failed to parse; first failure: {}",
            failures.len(),
            failures[0].error
        );
    }
    Ok(BatchOutcome { results, failures })
}

fn resolve_parse_encoding(
    bytes: &[u8],
    config: &ParseConfig,
) -> Result<(&'static Encoding, String), ParseError> {
    match config.encoding.as_deref() {
        Some(label) => {
            let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                ParseError::UnknownEncoding {
                    label: label.to_string(),
                }
            })?;
            Ok((encoding, encoding.name().to_ascii_lowercase()))
        }
        None => {
            let detected = detect::detect_encoding(bytes);
            Ok((detected.encoding(), detected.label().to_string()))
        }
    }
}

fn read_headers(
    record: &csv::StringRecord,
    config: &ParseConfig,
    issues: &mut Vec<ParseIssue>,
) -> Vec<String> {
    let mut seen_lower: BTreeSet<String> = BTreeSet::new();
    let mut names = Vec::with_capacity(record.len());
    for (index, field) in record.iter().enumerate() {
        let raw = if config.trim_whitespace {
            field.trim()
        } else {
            field
        };
        let name = if raw.is_empty() {
            let fallback = format!("column_{}", index + 1);
            issues.push(
                ParseIssue::warning(
                    issue_codes::EMPTY_HEADER,
                    format!("Header {} is empty; using '{fallback}'", index + 1),
                )
                .at_column(&fallback),
            );
            fallback
        } else {
            raw.to_string()
        };
        if !seen_lower.insert(name.to_ascii_lowercase()) {
            issues.push(
                ParseIssue::warning(
                    issue_codes::DUPLICATE_HEADER,
                    format!("Header '{name}' appears more than once (case-insensitive)"),
                )
                .at_column(&name),
            );
        }
        names.push(name);
    }
    names
}

fn synthesize_headers(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("column_{i}")).collect()
}

fn normalize_cell(field: Option<&str>, config: &ParseConfig) -> Option<String> {
    let raw = field?;
    let value = if config.trim_whitespace {
        raw.trim()
    } else {
        raw
    };
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn file_display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
