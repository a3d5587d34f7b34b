//! Pipeline glue: parsed files in, assembled [`DatabaseSchema`] out.
//!
//! One table is built per parse result (snake_cased file stem, columns in
//! header order, types from inference). Ranked relationship hints whose
//! endpoints resolve against the assembled tables are materialized into
//! typed relationships; the rest stay in the report for manual resolution.

use std::collections::BTreeMap;

use heck::ToSnakeCase;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    infer::{self, TypeInference},
    model::{
        Column, Constraint, DatabaseSchema, Position, Relationship, Table,
    },
    parse::{ColumnStats, ParseIssue, ParseResult},
    relationships::{
        self, DetectOptions, HintKind, RelationshipHint, classify_cardinality, table_name_for,
    },
};

/// Horizontal/vertical spacing of the default table layout grid.
const LAYOUT_COLUMN_WIDTH: f64 = 280.0;
const LAYOUT_ROW_HEIGHT: f64 = 220.0;
const LAYOUT_GRID_WIDTH: usize = 4;

/// Everything `analyze` learned about one file.
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub file_name: String,
    pub table: String,
    pub total_rows: usize,
    pub sampled_rows: usize,
    pub inferences: BTreeMap<String, TypeInference>,
    pub issues: Vec<ParseIssue>,
}

/// Full analysis output: the schema plus the evidence behind it. UI layers
/// display the inference reasoning and unresolved hints verbatim.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub schema: DatabaseSchema,
    pub tables: Vec<TableReport>,
    /// Ranked hints, including those that could not be materialized.
    pub hints: Vec<RelationshipHint>,
}

/// Builds a schema from parsed files: inference per column, `id` promotion,
/// then relationship materialization from ranked hints.
pub fn analyze(
    schema_name: &str,
    results: &[ParseResult],
    options: &DetectOptions,
) -> AnalysisReport {
    let mut schema = DatabaseSchema::new(schema_name);
    let mut reports = Vec::with_capacity(results.len());

    for (index, result) in results.iter().enumerate() {
        let table_name = table_name_for(&result.file_name);
        let inferences = infer::analyze_all_columns(&result.columns);
        let table = build_table(&table_name, index, result, &inferences);
        schema.tables.push(table);
        reports.push(TableReport {
            file_name: result.file_name.clone(),
            table: table_name,
            total_rows: result.total_rows,
            sampled_rows: result.sampled_rows,
            inferences: inferences
                .into_iter()
                .map(|(name, inference)| (name.to_snake_case(), inference))
                .collect(),
            issues: result.issues.clone(),
        });
    }

    let hints = relationships::rank_hints(relationships::detect_relationships(results, options));
    materialize_hints(&mut schema, results, &hints);
    schema.touch();

    AnalysisReport {
        schema,
        tables: reports,
        hints,
    }
}

fn build_table(
    name: &str,
    index: usize,
    result: &ParseResult,
    inferences: &BTreeMap<String, TypeInference>,
) -> Table {
    let mut table = Table::new(name);
    table.position = Position {
        x: (index % LAYOUT_GRID_WIDTH) as f64 * LAYOUT_COLUMN_WIDTH,
        y: (index / LAYOUT_GRID_WIDTH) as f64 * LAYOUT_ROW_HEIGHT,
    };

    for header in &result.headers {
        let Some(inference) = inferences.get(header) else {
            continue;
        };
        let mut column = Column::new(header.to_snake_case(), inference.datatype);
        column.length = inference.length;
        column.precision = inference.precision;
        column.scale = inference.scale;
        column.constraints = inference.constraints.clone();
        column.nullable = !column.has_not_null();
        if column.name == "id" {
            // UNIQUE is implied by the primary key.
            column
                .constraints
                .retain(|c| !matches!(c, Constraint::Unique));
            column.promote_to_primary_key();
        }
        table.columns.push(column);
    }
    table
}

fn materialize_hints(
    schema: &mut DatabaseSchema,
    results: &[ParseResult],
    hints: &[RelationshipHint],
) {
    let mut materialized = Vec::new();
    for hint in hints {
        // Junction-table hints carry no target column until resolved by hand.
        if hint.kind == HintKind::ManyToMany {
            continue;
        }
        let (Some(target_table), Some(target_column)) =
            (hint.target_table.as_deref(), hint.target_column.as_deref())
        else {
            continue;
        };
        let source_ok = schema
            .table(&hint.source_table)
            .is_some_and(|t| t.column(&hint.source_column).is_some());
        let target_ok = schema
            .table(target_table)
            .is_some_and(|t| t.column(target_column).is_some());
        if !source_ok || !target_ok {
            continue;
        }

        let call = match (
            column_stats(results, &hint.source_table, &hint.source_column),
            column_stats(results, target_table, target_column),
        ) {
            (Some(source), Some(target)) => classify_cardinality(source, target),
            _ => continue,
        };

        materialized.push(Relationship {
            id: Uuid::new_v4(),
            name: Some(format!(
                "{}_{}_fkey",
                hint.source_table, hint.source_column
            )),
            source_table: hint.source_table.clone(),
            source_column: hint.source_column.clone(),
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
            kind: call.kind,
            on_delete: None,
            on_update: None,
        });

        if let Some(column) = schema
            .table_mut(&hint.source_table)
            .and_then(|t| t.column_mut(&hint.source_column))
        {
            let already_fk = column
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::ForeignKey { .. }));
            if !already_fk {
                column.constraints.push(Constraint::ForeignKey {
                    referenced_table: target_table.to_string(),
                    referenced_column: target_column.to_string(),
                    on_delete: None,
                    on_update: None,
                });
            }
        }
    }
    schema.relationships = materialized;
}

/// Finds the sampled statistics backing a (table, column) pair, matching on
/// normalized names.
fn column_stats<'a>(
    results: &'a [ParseResult],
    table: &str,
    column: &str,
) -> Option<&'a ColumnStats> {
    results
        .iter()
        .find(|result| table_name_for(&result.file_name) == table)?
        .columns
        .iter()
        .find(|stats| stats.name.to_snake_case() == column)
}
