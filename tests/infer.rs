use std::collections::BTreeSet;

use proptest::prelude::*;
use schemaforge::infer::infer_column_type;
use schemaforge::model::{Constraint, PgType};
use schemaforge::parse::ColumnStats;
use uuid::Uuid;

fn stats_from(name: &str, values: &[String], null_count: usize) -> ColumnStats {
    let unique_values: BTreeSet<String> = values.iter().cloned().collect();
    ColumnStats {
        name: name.to_string(),
        sample_values: values.iter().take(20).cloned().collect(),
        unique_values,
        null_count,
        empty_count: 0,
        total_count: values.len() + null_count,
    }
}

fn has_check_containing(constraints: &[Constraint], needle: &str) -> bool {
    constraints.iter().any(|constraint| {
        matches!(constraint, Constraint::Check { expression } if expression.contains(needle))
    })
}

#[test]
fn uuid_column_infers_uuid_with_high_confidence() {
    let values: Vec<String> = (0..50).map(|_| Uuid::new_v4().to_string()).collect();
    let inference = infer_column_type(&stats_from("id", &values, 0));

    assert_eq!(inference.datatype, PgType::Uuid);
    assert!(inference.confidence >= 0.9, "got {}", inference.confidence);
    assert!(inference.constraints.contains(&Constraint::NotNull));
    assert!(inference.constraints.contains(&Constraint::Unique));
}

#[test]
fn column_without_nulls_gets_not_null() {
    let values: Vec<String> = (0..1000).map(|i| format!("value_{i}")).collect();
    let inference = infer_column_type(&stats_from("label", &values, 0));

    assert_eq!(inference.datatype, PgType::Varchar);
    assert!(inference.constraints.contains(&Constraint::NotNull));
}

#[test]
fn sparse_nulls_block_not_null() {
    let values: Vec<String> = (0..950).map(|i| format!("value_{i}")).collect();
    let inference = infer_column_type(&stats_from("label", &values, 50));

    assert!(!inference.constraints.contains(&Constraint::NotNull));
}

#[test]
fn low_cardinality_text_column_gets_check_in_constraint() {
    let statuses = ["active", "inactive", "pending"];
    let values: Vec<String> = (0..500).map(|i| statuses[i % 3].to_string()).collect();
    let inference = infer_column_type(&stats_from("status", &values, 0));

    assert_eq!(inference.datatype, PgType::Varchar);
    for status in statuses {
        assert!(
            has_check_containing(&inference.constraints, status),
            "CHECK should enumerate '{status}'"
        );
    }
    assert!(inference.reasoning.contains("low-cardinality"));
}

#[test]
fn all_null_column_falls_back_to_varchar() {
    let inference = infer_column_type(&stats_from("notes", &[], 25));

    assert_eq!(inference.datatype, PgType::Varchar);
    assert!((inference.confidence - 0.1).abs() < f64::EPSILON);
    assert_eq!(inference.length, Some(255));
    assert!(inference.constraints.is_empty());
}

#[test]
fn integer_magnitude_selects_width() {
    let small: Vec<String> = (100..150).map(|i| i.to_string()).collect();
    assert_eq!(
        infer_column_type(&stats_from("age", &small, 0)).datatype,
        PgType::Smallint
    );

    let big: Vec<String> = (0..20).map(|i| format!("{}", 3_000_000_000u64 + i)).collect();
    assert_eq!(
        infer_column_type(&stats_from("counter", &big, 0)).datatype,
        PgType::Bigint
    );
}

#[test]
fn email_column_gets_shape_check() {
    let values: Vec<String> = (0..40).map(|i| format!("user{i}@example.com")).collect();
    let inference = infer_column_type(&stats_from("contact", &values, 0));

    assert_eq!(inference.datatype, PgType::Varchar);
    assert!(has_check_containing(&inference.constraints, "@"));
    assert!(inference.reasoning.contains("email"));
}

#[test]
fn decimal_column_carries_precision_and_scale() {
    let values: Vec<String> = (0..30).map(|i| format!("{}.{:02}", 100 + i, i)).collect();
    let inference = infer_column_type(&stats_from("price", &values, 0));

    assert_eq!(inference.datatype, PgType::Numeric);
    assert!(inference.precision.is_some());
    assert_eq!(inference.scale, Some(2));
}

proptest! {
    #[test]
    fn inference_is_deterministic(values in proptest::collection::vec("[a-z0-9]{1,12}", 1..50)) {
        let stats = stats_from("col", &values, 0);
        prop_assert_eq!(infer_column_type(&stats), infer_column_type(&stats));
    }
}
