//! I/O plumbing: CSV reader defaults and output streams.
//!
//! Input bytes are decoded to UTF-8 before they reach the CSV layer, so the
//! readers built here only ever see valid UTF-8. The `-` path convention
//! routes through stdout.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// CSV reader over already-decoded input. Flexible mode is on: ragged rows
/// surface as parse warnings rather than hard errors.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

/// Output stream for exported schemas: a file, or stdout for `-`/`None`.
pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(std::io::stdout())),
    }
}
