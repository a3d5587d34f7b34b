use schemaforge::parse::{parse_bytes, ParseConfig, ParseResult};
use schemaforge::relationships::{
    classify_cardinality, detect_relationships, rank_hints, DetectOptions, HintKind,
    RelationshipHint,
};

fn parse_fixture(file_name: &str, csv: &str) -> ParseResult {
    parse_bytes(csv.as_bytes(), file_name, &ParseConfig::default()).expect("fixture parses")
}

fn hint(source_column: &str, target_table: &str, confidence: f64) -> RelationshipHint {
    RelationshipHint {
        source_table: "orders".to_string(),
        source_column: source_column.to_string(),
        target_table: Some(target_table.to_string()),
        target_column: Some("id".to_string()),
        confidence,
        kind: HintKind::ForeignKey,
        reasoning: String::new(),
    }
}

#[test]
fn manager_id_yields_self_reference() {
    let employees = parse_fixture(
        "employees.csv",
        "id,name,manager_id\n1,Ana,\n2,Bob,1\n3,Cid,1\n",
    );

    let hints = detect_relationships(&[employees], &DetectOptions::default());
    let self_ref = hints
        .iter()
        .find(|h| h.kind == HintKind::SelfReference && h.source_column == "manager_id")
        .expect("self-reference hint");

    assert_eq!(self_ref.source_table, "employees");
    assert_eq!(self_ref.target_table.as_deref(), Some("employees"));
    assert_eq!(self_ref.target_column.as_deref(), Some("id"));
    assert!((self_ref.confidence - 0.85).abs() < f64::EPSILON);
}

#[test]
fn common_fk_dictionary_targets_known_tables() {
    let orders = parse_fixture("orders.csv", "id,user_id,total\n1,7,9.50\n2,8,4.25\n");

    let hints = detect_relationships(&[orders], &DetectOptions::default());
    let fk = hints
        .iter()
        .find(|h| h.source_column == "user_id")
        .expect("user_id hint");

    assert_eq!(fk.target_table.as_deref(), Some("users"));
    assert!((fk.confidence - 0.9).abs() < f64::EPSILON);
}

#[test]
fn generic_id_suffix_pluralizes_the_stem() {
    let shipments = parse_fixture("shipments.csv", "id,warehouse_id\n1,3\n2,4\n");

    let hints = detect_relationships(&[shipments], &DetectOptions::default());
    let fk = hints
        .iter()
        .find(|h| h.source_column == "warehouse_id")
        .expect("warehouse_id hint");

    assert_eq!(fk.target_table.as_deref(), Some("warehouses"));
}

#[test]
fn junction_table_is_flagged_many_to_many() {
    let users = parse_fixture("users.csv", "id,name\n1,Ana\n2,Bob\n");
    let roles = parse_fixture("roles.csv", "id,label\n1,admin\n2,editor\n");
    let user_roles = parse_fixture("user_roles.csv", "user_id,role_id\n1,1\n1,2\n2,2\n");

    let hints = detect_relationships(&[users, roles, user_roles], &DetectOptions::default());
    let junction = hints
        .iter()
        .find(|h| h.kind == HintKind::ManyToMany && h.source_table == "user_roles")
        .expect("junction hint");

    assert!((junction.confidence - 0.8).abs() < f64::EPSILON);
    assert!(junction.target_table.is_none());
}

#[test]
fn value_overlap_links_unrelated_names() {
    let shipments = parse_fixture(
        "shipments.csv",
        "id,origin\n1,AMS\n2,BER\n3,CDG\n4,AMS\n5,BER\n",
    );
    let airports = parse_fixture(
        "airports.csv",
        "code,city\nAMS,Amsterdam\nBER,Berlin\nCDG,Paris\nLIS,Lisbon\n",
    );

    let hints = detect_relationships(&[shipments, airports], &DetectOptions::default());
    assert!(
        hints.iter().any(|h| {
            h.source_column == "origin" && h.target_table.as_deref() == Some("airports")
        }),
        "overlap pass should link shipments.origin to airports"
    );

    let without = detect_relationships(
        &[
            parse_fixture("shipments.csv", "id,origin\n1,AMS\n2,BER\n3,CDG\n4,AMS\n5,BER\n"),
            parse_fixture(
                "airports.csv",
                "code,city\nAMS,Amsterdam\nBER,Berlin\nCDG,Paris\nLIS,Lisbon\n",
            ),
        ],
        &DetectOptions {
            value_overlap: false,
        },
    );
    assert!(
        !without.iter().any(|h| h.source_column == "origin"),
        "overlap pass should be skippable"
    );
}

#[test]
fn ranking_keeps_the_strongest_hint_per_column() {
    let ranked = rank_hints(vec![
        hint("customer_id", "customers", 0.6),
        hint("customer_id", "users", 0.9),
        hint("note_id", "notes", 0.2),
    ]);

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].target_table.as_deref(), Some("users"));
}

#[test]
fn ranking_sorts_by_descending_confidence() {
    let ranked = rank_hints(vec![
        hint("a_id", "alphas", 0.5),
        hint("b_id", "betas", 0.9),
        hint("c_id", "gammas", 0.7),
    ]);

    let confidences: Vec<f64> = ranked.iter().map(|h| h.confidence).collect();
    assert_eq!(confidences, vec![0.9, 0.7, 0.5]);
}

#[test]
fn cardinality_from_uniqueness_ratios() {
    let unique = parse_fixture(
        "a.csv",
        "id\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n",
    );
    let repeated = parse_fixture(
        "b.csv",
        "ref\n1\n1\n1\n2\n2\n2\n3\n3\n3\n1\n2\n3\n",
    );

    let one_to_one = classify_cardinality(&unique.columns[0], &unique.columns[0]);
    assert_eq!(one_to_one.kind, schemaforge::model::RelationshipKind::OneToOne);

    let one_to_many = classify_cardinality(&unique.columns[0], &repeated.columns[0]);
    assert_eq!(
        one_to_many.kind,
        schemaforge::model::RelationshipKind::OneToMany
    );

    let many_to_many = classify_cardinality(&repeated.columns[0], &repeated.columns[0]);
    assert_eq!(
        many_to_many.kind,
        schemaforge::model::RelationshipKind::ManyToMany
    );
}
