pub mod assemble;
pub mod cli;
pub mod detect;
pub mod infer;
pub mod io_utils;
pub mod model;
pub mod parse;
pub mod postprocess;
pub mod relationships;
pub mod validate;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{Cli, Commands},
    parse::ParseConfig,
    relationships::DetectOptions,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("schemaforge", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Validate(args) => handle_validate(&args),
        Commands::Repair(args) => handle_repair(&args),
    }
}

fn handle_analyze(args: &cli::AnalyzeArgs) -> Result<()> {
    info!("Analyzing {} input file(s)", args.inputs.len());
    let config = ParseConfig {
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
        has_header: !args.no_header,
        sample_size: args.sample_rows,
        ..ParseConfig::default()
    };
    let outcome = parse::parse_batch(&args.inputs, &config)?;
    for failure in &outcome.failures {
        warn!("{}: {}", failure.path.display(), failure.error);
    }

    let options = DetectOptions {
        value_overlap: !args.no_overlap,
    };
    let report = assemble::analyze(&args.name, &outcome.results, &options);

    for table in &report.tables {
        info!(
            "Table '{}': {} column(s), {} row(s) ({} sampled), {} parse warning(s)",
            table.table,
            report
                .schema
                .table(&table.table)
                .map(|t| t.columns.len())
                .unwrap_or(0),
            table.total_rows,
            table.sampled_rows,
            table.issues.len()
        );
    }
    info!(
        "Materialized {} relationship(s) from {} ranked hint(s)",
        report.schema.relationships.len(),
        report.hints.len()
    );

    if let Some(path) = &args.report {
        let json =
            serde_json::to_string_pretty(&report).context("Serializing analysis report")?;
        std::fs::write(path, json).with_context(|| format!("Writing report to {path:?}"))?;
        info!("Analysis report written to {path:?}");
    }

    write_schema(&report.schema, args.output.as_deref())?;
    Ok(())
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let schema = model::DatabaseSchema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    let report = validate::validate_schema(&schema);
    for finding in &report.warnings {
        warn!("[{}] {}", finding.code, finding.message);
        if let Some(suggestion) = &finding.suggestion {
            warn!("  suggestion: {suggestion}");
        }
    }
    for finding in &report.errors {
        log::error!("[{}] {}", finding.code, finding.message);
    }
    if !report.is_valid {
        bail!(
            "Schema '{}' failed validation with {} error(s)",
            schema.name,
            report.errors.len()
        );
    }
    info!(
        "Schema '{}' is valid ({} warning(s))",
        schema.name,
        report.warnings.len()
    );
    Ok(())
}

fn handle_repair(args: &cli::RepairArgs) -> Result<()> {
    let schema = model::DatabaseSchema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    let outcome = postprocess::post_process_schema_types(&schema);
    for correction in &outcome.corrections {
        info!(
            "Corrected {}.{}: {} -> {}",
            correction.table, correction.column, correction.from, correction.to
        );
    }
    info!("{} correction(s) applied", outcome.correction_count());
    write_schema(&outcome.schema, args.output.as_deref())?;
    Ok(())
}

fn write_schema(
    schema: &model::DatabaseSchema,
    output: Option<&std::path::Path>,
) -> Result<()> {
    match output {
        Some(path) if !io_utils::is_dash(path) => {
            schema
                .save(path)
                .with_context(|| format!("Writing schema to {path:?}"))?;
            info!("Schema '{}' written to {path:?}", schema.name);
        }
        _ => {
            let mut out = io_utils::create_output(None)?;
            writeln!(out, "{}", schema.to_json_string()?)
                .context("Writing schema to stdout")?;
        }
    }
    Ok(())
}
