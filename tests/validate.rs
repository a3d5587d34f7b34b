use schemaforge::model::{
    Column, DatabaseSchema, PgType, Relationship, RelationshipKind, Table,
};
use schemaforge::validate::{codes, validate_schema, validate_schema_with_limits, ValidationLimits};
use uuid::Uuid;

fn table_with(name: &str, columns: Vec<Column>) -> Table {
    let mut table = Table::new(name);
    table.columns = columns;
    table
}

fn pk_column(name: &str, datatype: PgType) -> Column {
    let mut column = Column::new(name, datatype);
    column.promote_to_primary_key();
    column
}

fn sample_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new("shop");
    let mut name = Column::new("name", PgType::Varchar);
    name.length = Some(255);
    schema
        .tables
        .push(table_with("users", vec![pk_column("id", PgType::Uuid), name]));
    schema
}

fn fk_relationship(source_table: &str, source_column: &str, target_table: &str) -> Relationship {
    Relationship {
        id: Uuid::new_v4(),
        name: None,
        source_table: source_table.to_string(),
        source_column: source_column.to_string(),
        target_table: target_table.to_string(),
        target_column: "id".to_string(),
        kind: RelationshipKind::OneToMany,
        on_delete: None,
        on_update: None,
    }
}

fn has_error(report: &schemaforge::validate::ValidationReport, code: &str) -> bool {
    report.errors.iter().any(|finding| finding.code == code)
}

fn has_warning(report: &schemaforge::validate::ValidationReport, code: &str) -> bool {
    report.warnings.iter().any(|finding| finding.code == code)
}

#[test]
fn well_formed_schema_is_valid() {
    let report = validate_schema(&sample_schema());
    assert!(report.is_valid, "errors: {:?}", report.errors);
}

#[test]
fn empty_schema_is_rejected() {
    let report = validate_schema(&DatabaseSchema::new("void"));
    assert!(!report.is_valid);
    assert!(has_error(&report, codes::SCHEMA_EMPTY));
}

#[test]
fn duplicate_table_names_are_rejected() {
    let mut schema = sample_schema();
    schema
        .tables
        .push(table_with("users", vec![pk_column("id", PgType::Uuid)]));

    let report = validate_schema(&schema);
    assert!(has_error(&report, codes::DUPLICATE_TABLE_NAME));
}

#[test]
fn invalid_identifiers_are_rejected() {
    let mut schema = sample_schema();
    schema
        .tables
        .push(table_with("2fast", vec![pk_column("id", PgType::Uuid)]));
    schema.tables[0]
        .columns
        .push(Column::new("First Name", PgType::Text));

    let report = validate_schema(&schema);
    assert!(has_error(&report, codes::INVALID_TABLE_NAME));
    assert!(has_error(&report, codes::INVALID_COLUMN_NAME));
}

#[test]
fn multiple_primary_keys_is_an_error() {
    let mut schema = sample_schema();
    let second = pk_column("alt_id", PgType::Uuid);
    schema.tables[0].columns.push(second);

    let report = validate_schema(&schema);
    assert!(!report.is_valid);
    assert!(has_error(&report, codes::MULTIPLE_PRIMARY_KEYS));
}

#[test]
fn missing_primary_key_is_only_a_warning() {
    let mut name = Column::new("name", PgType::Varchar);
    name.length = Some(255);
    let mut schema = DatabaseSchema::new("shop");
    schema.tables.push(table_with("logs", vec![name]));

    let report = validate_schema(&schema);
    assert!(report.is_valid);
    assert!(has_warning(&report, codes::MISSING_PRIMARY_KEY));
    let warning = report
        .warnings
        .iter()
        .find(|finding| finding.code == codes::MISSING_PRIMARY_KEY)
        .expect("warning present");
    assert!(warning.suggestion.is_some());
}

#[test]
fn varchar_needs_a_length_in_range() {
    let mut schema = sample_schema();
    schema.tables[0]
        .columns
        .push(Column::new("bare", PgType::Varchar));
    let mut oversized = Column::new("oversized", PgType::Varchar);
    oversized.length = Some(100_000);
    schema.tables[0].columns.push(oversized);

    let report = validate_schema(&schema);
    assert!(has_warning(&report, codes::VARCHAR_MISSING_LENGTH));
    assert!(has_error(&report, codes::VARCHAR_LENGTH_OUT_OF_RANGE));
}

#[test]
fn numeric_scale_cannot_exceed_precision() {
    let mut schema = sample_schema();
    let mut price = Column::new("price", PgType::Numeric);
    price.precision = Some(4);
    price.scale = Some(6);
    schema.tables[0].columns.push(price);

    let report = validate_schema(&schema);
    assert!(has_error(&report, codes::NUMERIC_SCALE_EXCEEDS_PRECISION));
}

#[test]
fn nullable_primary_key_is_rejected() {
    let mut schema = sample_schema();
    schema.tables[0].columns[0].nullable = true;

    let report = validate_schema(&schema);
    assert!(has_error(&report, codes::NULLABLE_PRIMARY_KEY));
}

#[test]
fn relationships_must_reference_existing_endpoints() {
    let mut schema = sample_schema();
    schema
        .relationships
        .push(fk_relationship("users", "name", "missing"));
    schema
        .relationships
        .push(fk_relationship("ghosts", "id", "users"));

    let report = validate_schema(&schema);
    assert!(has_error(&report, codes::UNKNOWN_TARGET_TABLE));
    assert!(has_error(&report, codes::UNKNOWN_SOURCE_TABLE));
}

#[test]
fn table_count_limit_is_enforced() {
    let mut schema = DatabaseSchema::new("wide");
    for i in 0..3 {
        schema
            .tables
            .push(table_with(&format!("t{i}"), vec![pk_column("id", PgType::Uuid)]));
    }

    let limits = ValidationLimits {
        max_tables: 2,
        max_columns: 100,
    };
    let report = validate_schema_with_limits(&schema, &limits);
    assert!(has_error(&report, codes::TOO_MANY_TABLES));
}
