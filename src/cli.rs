use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer relational schemas from CSV files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze one or more CSV files and emit an inferred schema
    Analyze(AnalyzeArgs),
    /// Validate a schema file against structural rules
    Validate(ValidateArgs),
    /// Repair a schema's column types using naming heuristics
    Repair(RepairArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// One or more CSV files to analyze
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Output schema file (.json or .yaml; stdout JSON if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Schema name recorded in the output
    #[arg(long, default_value = "inferred")]
    pub name: String,
    /// Number of rows to sample per file when inferring types
    #[arg(long, default_value_t = 1000)]
    pub sample_rows: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'; detected if omitted)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (detected if omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Treat the first row as data rather than headers
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Skip the pairwise value-overlap relationship pass
    #[arg(long = "no-overlap")]
    pub no_overlap: bool,
    /// Also emit the full analysis report (inference reasoning, hints)
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Schema file to validate (.json or .yaml)
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
}

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Schema file to repair (.json or .yaml)
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// Output file for the corrected schema (stdout JSON if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
