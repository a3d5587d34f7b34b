//! Structural schema validation.
//!
//! [`validate_schema`] is a pure function over an assembled
//! [`DatabaseSchema`]: it never fails, it returns a [`ValidationReport`]
//! splitting findings into deployment-blocking errors and advisory warnings.
//! Every finding carries a stable code plus table/column locators so UI
//! layers can render it without string matching.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::model::{
    Column, DatabaseSchema, MAX_IDENTIFIER_LENGTH, MAX_VARCHAR_LENGTH, PgType, Relationship, Table,
};

/// Stable codes carried by every [`ValidationFinding`].
pub mod codes {
    pub const SCHEMA_EMPTY: &str = "schema_empty";
    pub const TOO_MANY_TABLES: &str = "too_many_tables";
    pub const INVALID_TABLE_NAME: &str = "invalid_table_name";
    pub const TABLE_NAME_TOO_LONG: &str = "table_name_too_long";
    pub const DUPLICATE_TABLE_NAME: &str = "duplicate_table_name";
    pub const TABLE_NO_COLUMNS: &str = "table_no_columns";
    pub const TOO_MANY_COLUMNS: &str = "too_many_columns";
    pub const MULTIPLE_PRIMARY_KEYS: &str = "multiple_primary_keys";
    pub const MISSING_PRIMARY_KEY: &str = "missing_primary_key";
    pub const INVALID_COLUMN_NAME: &str = "invalid_column_name";
    pub const COLUMN_NAME_TOO_LONG: &str = "column_name_too_long";
    pub const DUPLICATE_COLUMN_NAME: &str = "duplicate_column_name";
    pub const VARCHAR_MISSING_LENGTH: &str = "varchar_missing_length";
    pub const VARCHAR_LENGTH_OUT_OF_RANGE: &str = "varchar_length_out_of_range";
    pub const NUMERIC_SCALE_EXCEEDS_PRECISION: &str = "numeric_scale_exceeds_precision";
    pub const NULLABLE_PRIMARY_KEY: &str = "nullable_primary_key";
    pub const UNKNOWN_SOURCE_TABLE: &str = "unknown_source_table";
    pub const UNKNOWN_TARGET_TABLE: &str = "unknown_target_table";
    pub const UNKNOWN_SOURCE_COLUMN: &str = "unknown_source_column";
    pub const UNKNOWN_TARGET_COLUMN: &str = "unknown_target_column";
}

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("identifier regex"));

#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub max_tables: usize,
    pub max_columns: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_tables: 100,
            max_columns: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationFinding {
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
}

impl ValidationReport {
    fn error(&mut self, code: &'static str, table: Option<&str>, column: Option<&str>, message: String) {
        self.errors.push(ValidationFinding {
            code,
            table: table.map(str::to_string),
            column: column.map(str::to_string),
            message,
            suggestion: None,
        });
    }

    fn warn(
        &mut self,
        code: &'static str,
        table: Option<&str>,
        column: Option<&str>,
        message: String,
        suggestion: String,
    ) {
        self.warnings.push(ValidationFinding {
            code,
            table: table.map(str::to_string),
            column: column.map(str::to_string),
            message,
            suggestion: Some(suggestion),
        });
    }
}

/// Validates against the default limits.
pub fn validate_schema(schema: &DatabaseSchema) -> ValidationReport {
    validate_schema_with_limits(schema, &ValidationLimits::default())
}

pub fn validate_schema_with_limits(
    schema: &DatabaseSchema,
    limits: &ValidationLimits,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if schema.tables.is_empty() {
        report.error(
            codes::SCHEMA_EMPTY,
            None,
            None,
            "Schema contains no tables".to_string(),
        );
    }
    if schema.tables.len() > limits.max_tables {
        report.error(
            codes::TOO_MANY_TABLES,
            None,
            None,
            format!(
                "Schema has {} tables; the limit is {}",
                schema.tables.len(),
                limits.max_tables
            ),
        );
    }

    let mut seen_tables: BTreeSet<&str> = BTreeSet::new();
    for table in &schema.tables {
        if !seen_tables.insert(table.name.as_str()) {
            report.error(
                codes::DUPLICATE_TABLE_NAME,
                Some(&table.name),
                None,
                format!("Table name '{}' is used more than once", table.name),
            );
        }
        validate_table_into(table, limits, &mut report);
    }

    for relationship in &schema.relationships {
        validate_relationship_into(schema, relationship, &mut report);
    }

    report.is_valid = report.errors.is_empty();
    report
}

/// Validates a single table in isolation (no relationship checks).
pub fn validate_table(table: &Table) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_table_into(table, &ValidationLimits::default(), &mut report);
    report.is_valid = report.errors.is_empty();
    report
}

/// Validates a single column in isolation.
pub fn validate_column(table_name: &str, column: &Column) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_column_into(table_name, column, &mut report);
    report.is_valid = report.errors.is_empty();
    report
}

fn validate_table_into(table: &Table, limits: &ValidationLimits, report: &mut ValidationReport) {
    check_identifier(
        &table.name,
        codes::INVALID_TABLE_NAME,
        codes::TABLE_NAME_TOO_LONG,
        Some(&table.name),
        None,
        "table",
        report,
    );

    if table.columns.is_empty() {
        report.error(
            codes::TABLE_NO_COLUMNS,
            Some(&table.name),
            None,
            format!("Table '{}' has no columns", table.name),
        );
    }
    if table.columns.len() > limits.max_columns {
        report.error(
            codes::TOO_MANY_COLUMNS,
            Some(&table.name),
            None,
            format!(
                "Table '{}' has {} columns; the limit is {}",
                table.name,
                table.columns.len(),
                limits.max_columns
            ),
        );
    }

    // First primary key wins; every later one is reported as the violation.
    let mut primary_key: Option<&str> = None;
    let mut seen_columns: BTreeSet<String> = BTreeSet::new();
    for column in &table.columns {
        if !seen_columns.insert(column.name.clone()) {
            report.error(
                codes::DUPLICATE_COLUMN_NAME,
                Some(&table.name),
                Some(&column.name),
                format!(
                    "Column name '{}' is used more than once in table '{}'",
                    column.name, table.name
                ),
            );
        }
        if column.is_primary_key() {
            match primary_key {
                None => primary_key = Some(&column.name),
                Some(first) => report.error(
                    codes::MULTIPLE_PRIMARY_KEYS,
                    Some(&table.name),
                    Some(&column.name),
                    format!(
                        "Table '{}' already has primary key '{first}'; '{}' cannot also be one",
                        table.name, column.name
                    ),
                ),
            }
        }
        validate_column_into(&table.name, column, report);
    }

    if primary_key.is_none() && !table.columns.is_empty() {
        report.warn(
            codes::MISSING_PRIMARY_KEY,
            Some(&table.name),
            None,
            format!("Table '{}' has no primary key", table.name),
            "Add a primary key column, e.g. a UUID 'id'".to_string(),
        );
    }
}

fn validate_column_into(table_name: &str, column: &Column, report: &mut ValidationReport) {
    check_identifier(
        &column.name,
        codes::INVALID_COLUMN_NAME,
        codes::COLUMN_NAME_TOO_LONG,
        Some(table_name),
        Some(&column.name),
        "column",
        report,
    );

    if column.datatype == PgType::Varchar {
        match column.length {
            None => report.warn(
                codes::VARCHAR_MISSING_LENGTH,
                Some(table_name),
                Some(&column.name),
                format!("varchar column '{}' has no explicit length", column.name),
                "Set a length or the engine default will apply".to_string(),
            ),
            Some(length) if !(1..=MAX_VARCHAR_LENGTH).contains(&length) => report.error(
                codes::VARCHAR_LENGTH_OUT_OF_RANGE,
                Some(table_name),
                Some(&column.name),
                format!(
                    "varchar length {length} on '{}' is outside 1..={MAX_VARCHAR_LENGTH}; use text for unbounded values",
                    column.name
                ),
            ),
            Some(_) => {}
        }
    }

    if column.datatype == PgType::Numeric
        && let (Some(precision), Some(scale)) = (column.precision, column.scale)
        && scale > precision
    {
        report.error(
            codes::NUMERIC_SCALE_EXCEEDS_PRECISION,
            Some(table_name),
            Some(&column.name),
            format!(
                "numeric scale {scale} exceeds precision {precision} on '{}'",
                column.name
            ),
        );
    }

    if column.is_primary_key() && column.nullable {
        report.error(
            codes::NULLABLE_PRIMARY_KEY,
            Some(table_name),
            Some(&column.name),
            format!(
                "primary key column '{}' must not be nullable",
                column.name
            ),
        );
    }
}

fn validate_relationship_into(
    schema: &DatabaseSchema,
    relationship: &Relationship,
    report: &mut ValidationReport,
) {
    let source = schema.table(&relationship.source_table);
    let target = schema.table(&relationship.target_table);

    match source {
        None => report.error(
            codes::UNKNOWN_SOURCE_TABLE,
            Some(&relationship.source_table),
            None,
            format!(
                "Relationship references missing source table '{}'",
                relationship.source_table
            ),
        ),
        Some(table) if table.column(&relationship.source_column).is_none() => report.error(
            codes::UNKNOWN_SOURCE_COLUMN,
            Some(&relationship.source_table),
            Some(&relationship.source_column),
            format!(
                "Relationship references missing column '{}.{}'",
                relationship.source_table, relationship.source_column
            ),
        ),
        Some(_) => {}
    }

    match target {
        None => report.error(
            codes::UNKNOWN_TARGET_TABLE,
            Some(&relationship.target_table),
            None,
            format!(
                "Relationship references missing target table '{}'",
                relationship.target_table
            ),
        ),
        Some(table) if table.column(&relationship.target_column).is_none() => report.error(
            codes::UNKNOWN_TARGET_COLUMN,
            Some(&relationship.target_table),
            Some(&relationship.target_column),
            format!(
                "Relationship references missing column '{}.{}'",
                relationship.target_table, relationship.target_column
            ),
        ),
        Some(_) => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn check_identifier(
    name: &str,
    invalid_code: &'static str,
    too_long_code: &'static str,
    table: Option<&str>,
    column: Option<&str>,
    noun: &str,
    report: &mut ValidationReport,
) {
    if !IDENTIFIER_RE.is_match(name) {
        report.error(
            invalid_code,
            table,
            column,
            format!(
                "{noun} name '{name}' must be lowercase, start with a letter, and contain only [a-z0-9_]"
            ),
        );
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        report.error(
            too_long_code,
            table,
            column,
            format!(
                "{noun} name '{name}' is {} characters; the limit is {MAX_IDENTIFIER_LENGTH}",
                name.len()
            ),
        );
    }
}
