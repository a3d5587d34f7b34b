use schemaforge::model::{Column, DatabaseSchema, PgType, Table};
use schemaforge::postprocess::post_process_schema_types;

fn varchar(name: &str) -> Column {
    let mut column = Column::new(name, PgType::Varchar);
    column.length = Some(255);
    column
}

fn text(name: &str) -> Column {
    Column::new(name, PgType::Text)
}

fn schema_with(columns: Vec<Column>) -> DatabaseSchema {
    let mut table = Table::new("events");
    table.columns = columns;
    let mut schema = DatabaseSchema::new("demo");
    schema.tables.push(table);
    schema
}

fn datatype_of(schema: &DatabaseSchema, column: &str) -> PgType {
    schema.tables[0]
        .columns
        .iter()
        .find(|c| c.name == column)
        .map(|c| c.datatype)
        .expect("column exists")
}

#[test]
fn timestamp_audit_columns_are_corrected() {
    let schema = schema_with(vec![varchar("created_at"), varchar("updated_at")]);
    let outcome = post_process_schema_types(&schema);

    assert_eq!(datatype_of(&outcome.schema, "created_at"), PgType::Timestamptz);
    assert_eq!(datatype_of(&outcome.schema, "updated_at"), PgType::Timestamptz);
    assert_eq!(outcome.correction_count(), 2);
}

#[test]
fn id_columns_become_uuid() {
    let schema = schema_with(vec![varchar("id"), varchar("customer_id")]);
    let outcome = post_process_schema_types(&schema);

    assert_eq!(datatype_of(&outcome.schema, "id"), PgType::Uuid);
    assert_eq!(datatype_of(&outcome.schema, "customer_id"), PgType::Uuid);
}

#[test]
fn money_columns_become_numeric() {
    let schema = schema_with(vec![varchar("price"), varchar("total_amount")]);
    let outcome = post_process_schema_types(&schema);

    let price = outcome.schema.tables[0]
        .columns
        .iter()
        .find(|c| c.name == "price")
        .expect("price column");
    assert_eq!(price.datatype, PgType::Numeric);
    assert_eq!(price.precision, Some(10));
    assert_eq!(price.scale, Some(2));
    assert_eq!(datatype_of(&outcome.schema, "total_amount"), PgType::Numeric);
}

#[test]
fn boolean_flags_are_corrected() {
    let schema = schema_with(vec![text("is_active"), text("has_license")]);
    let outcome = post_process_schema_types(&schema);

    assert_eq!(datatype_of(&outcome.schema, "is_active"), PgType::Boolean);
    assert_eq!(datatype_of(&outcome.schema, "has_license"), PgType::Boolean);
}

#[test]
fn coordinates_get_fixed_precision() {
    let schema = schema_with(vec![text("latitude"), text("longitude")]);
    let outcome = post_process_schema_types(&schema);

    let latitude = outcome.schema.tables[0]
        .columns
        .iter()
        .find(|c| c.name == "latitude")
        .expect("latitude column");
    assert_eq!(latitude.datatype, PgType::Numeric);
    assert_eq!(latitude.precision, Some(10));
    assert_eq!(latitude.scale, Some(6));
}

#[test]
fn already_correct_columns_are_untouched() {
    let schema = schema_with(vec![Column::new("created_at", PgType::Timestamptz)]);
    let outcome = post_process_schema_types(&schema);

    assert_eq!(outcome.correction_count(), 0);
}

#[test]
fn input_schema_is_never_mutated() {
    let schema = schema_with(vec![varchar("created_at")]);
    let before = serde_json::to_string(&schema).expect("serialize");

    let _ = post_process_schema_types(&schema);

    let after = serde_json::to_string(&schema).expect("serialize");
    assert_eq!(before, after);
}

#[test]
fn post_processing_is_idempotent() {
    let schema = schema_with(vec![
        varchar("id"),
        varchar("created_at"),
        varchar("price"),
        varchar("is_public"),
    ]);

    let first = post_process_schema_types(&schema);
    let second = post_process_schema_types(&first.schema);

    assert_eq!(second.correction_count(), 0);
    assert_eq!(
        serde_json::to_string(&first.schema).expect("serialize"),
        serde_json::to_string(&second.schema).expect("serialize")
    );
}
