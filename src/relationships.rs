//! Foreign-key, self-reference, and junction-table detection.
//!
//! Detection runs several independent passes over parsed files, each emitting
//! [`RelationshipHint`]s with a confidence score and a human-readable
//! justification. [`rank_hints`] is the separate reducer that discards weak
//! hints and keeps the single best hint per source column; keeping the two
//! stages apart keeps both independently testable.

use std::{collections::BTreeSet, path::Path};

use heck::ToSnakeCase;
use itertools::Itertools;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    model::RelationshipKind,
    parse::{ColumnStats, ParseResult},
};

/// Hints below this confidence are discarded during ranking.
const MIN_HINT_CONFIDENCE: f64 = 0.3;
/// Fraction of distinct values that must be UUID-shaped for the generic
/// foreign-key pass to fire.
const UUID_SHAPE_THRESHOLD: f64 = 0.8;
/// Minimum overlap ratio and intersection size for the value-overlap pass.
const OVERLAP_RATIO_THRESHOLD: f64 = 0.5;
const OVERLAP_MIN_INTERSECTION: usize = 2;

/// Column names that conventionally point back at the same table.
const HIERARCHICAL_COLUMNS: &[&str] = &[
    "parent_id",
    "parentid",
    "manager_id",
    "managerid",
    "supervisor_id",
    "supervisorid",
    "owner_id",
    "ownerid",
    "reports_to_id",
    "reports_to",
    "predecessor_id",
    "superior_id",
];

/// Conventional column-name to target-table pairs.
const COMMON_FK_TARGETS: &[(&str, &str)] = &[
    ("user_id", "users"),
    ("customer_id", "customers"),
    ("product_id", "products"),
    ("category_id", "categories"),
    ("order_id", "orders"),
    ("account_id", "accounts"),
    ("company_id", "companies"),
    ("employee_id", "employees"),
    ("department_id", "departments"),
    ("project_id", "projects"),
    ("team_id", "teams"),
    ("role_id", "roles"),
    ("group_id", "groups"),
    ("tag_id", "tags"),
    ("post_id", "posts"),
    ("comment_id", "comments"),
    ("author_id", "authors"),
    ("invoice_id", "invoices"),
    ("payment_id", "payments"),
    ("address_id", "addresses"),
    ("country_id", "countries"),
    ("supplier_id", "suppliers"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintKind {
    ForeignKey,
    ManyToMany,
    SelfReference,
}

/// A proposed relationship, pre-schema. Many hints may exist per column;
/// ranking keeps only the strongest.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipHint {
    pub source_table: String,
    pub source_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    pub confidence: f64,
    pub kind: HintKind,
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Enables the pairwise O(n²) value-overlap pass in multi-file mode.
    pub value_overlap: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            value_overlap: true,
        }
    }
}

/// Derives the table name a parsed file maps to: file stem, snake_cased.
pub fn table_name_for(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_snake_case()
}

/// Runs every applicable detection pass over the parsed files.
pub fn detect_relationships(
    results: &[ParseResult],
    options: &DetectOptions,
) -> Vec<RelationshipHint> {
    let tables: Vec<(String, &ParseResult)> = results
        .iter()
        .map(|result| (table_name_for(&result.file_name), result))
        .collect();

    let mut hints = Vec::new();
    for (name, result) in &tables {
        self_reference_pass(name, result, &mut hints);
        implicit_fk_pass(name, result, &mut hints);
    }
    if tables.len() > 1 {
        cross_table_pass(&tables, &mut hints);
        junction_table_pass(&tables, &mut hints);
        if options.value_overlap {
            value_overlap_pass(&tables, &mut hints);
        }
    }
    hints
}

/// Keeps the single highest-confidence hint per source column, sorted by
/// descending confidence. Hints under the floor are dropped first.
pub fn rank_hints(hints: Vec<RelationshipHint>) -> Vec<RelationshipHint> {
    let mut survivors: Vec<RelationshipHint> = Vec::new();
    for hint in hints {
        if hint.confidence < MIN_HINT_CONFIDENCE {
            continue;
        }
        match survivors.iter_mut().find(|existing| {
            existing.source_table == hint.source_table
                && existing.source_column == hint.source_column
        }) {
            Some(existing) => {
                if hint.confidence > existing.confidence {
                    *existing = hint;
                }
            }
            None => survivors.push(hint),
        }
    }
    survivors.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_table.cmp(&b.source_table))
            .then_with(|| a.source_column.cmp(&b.source_column))
    });
    survivors
}

fn self_reference_pass(table: &str, result: &ParseResult, hints: &mut Vec<RelationshipHint>) {
    let own_id = format!("{}_id", singularize(table));
    for column in &result.headers {
        let lowered = column.to_snake_case();
        if HIERARCHICAL_COLUMNS.contains(&lowered.as_str()) {
            hints.push(RelationshipHint {
                source_table: table.to_string(),
                source_column: lowered.clone(),
                target_table: Some(table.to_string()),
                target_column: Some("id".to_string()),
                confidence: 0.85,
                kind: HintKind::SelfReference,
                reasoning: format!(
                    "'{column}' matches a hierarchical naming pattern; rows likely reference other rows of '{table}'"
                ),
            });
        } else if lowered == own_id {
            hints.push(RelationshipHint {
                source_table: table.to_string(),
                source_column: lowered.clone(),
                target_table: Some(table.to_string()),
                target_column: Some("id".to_string()),
                confidence: 0.8,
                kind: HintKind::SelfReference,
                reasoning: format!(
                    "'{column}' is named after its own table; rows likely reference other rows of '{table}'"
                ),
            });
        }
    }
}

fn implicit_fk_pass(table: &str, result: &ParseResult, hints: &mut Vec<RelationshipHint>) {
    for stats in &result.columns {
        let lowered = stats.name.to_snake_case();

        if let Some((_, target)) = COMMON_FK_TARGETS
            .iter()
            .find(|(pattern, _)| *pattern == lowered)
        {
            hints.push(RelationshipHint {
                source_table: table.to_string(),
                source_column: lowered.clone(),
                target_table: Some((*target).to_string()),
                target_column: Some("id".to_string()),
                confidence: 0.9,
                kind: HintKind::ForeignKey,
                reasoning: format!("'{lowered}' is a conventional reference to '{target}'"),
            });
        }

        if lowered != "id"
            && let Some(stem) = lowered.strip_suffix("_id")
            && !stem.is_empty()
        {
            let target = pluralize(stem);
            hints.push(RelationshipHint {
                source_table: table.to_string(),
                source_column: lowered.clone(),
                target_table: Some(target.clone()),
                target_column: Some("id".to_string()),
                confidence: 0.7,
                kind: HintKind::ForeignKey,
                reasoning: format!(
                    "'{lowered}' follows the <entity>_id convention, suggesting a reference to '{target}'"
                ),
            });
        }

        if lowered != "id" && uuid_shape_ratio(&stats.unique_values) > UUID_SHAPE_THRESHOLD {
            hints.push(RelationshipHint {
                source_table: table.to_string(),
                source_column: lowered.clone(),
                target_table: None,
                target_column: None,
                confidence: 0.6,
                kind: HintKind::ForeignKey,
                reasoning: format!(
                    "'{lowered}' holds mostly UUID-shaped values; likely a reference to another table"
                ),
            });
        }
    }
}

fn cross_table_pass(tables: &[(String, &ParseResult)], hints: &mut Vec<RelationshipHint>) {
    for (table, result) in tables {
        for column in &result.headers {
            let lowered = column.to_snake_case();
            for (other, _) in tables {
                if other == table {
                    continue;
                }
                let singular = singularize(other);
                let forms = [
                    format!("{singular}_id"),
                    format!("{singular}id"),
                    singular.clone(),
                    other.clone(),
                ];
                if forms.iter().any(|form| *form == lowered) {
                    let confidence = if lowered.ends_with("_id") { 0.9 } else { 0.7 };
                    hints.push(RelationshipHint {
                        source_table: table.clone(),
                        source_column: lowered.clone(),
                        target_table: Some(other.clone()),
                        target_column: Some("id".to_string()),
                        confidence,
                        kind: HintKind::ForeignKey,
                        reasoning: format!(
                            "'{lowered}' in '{table}' matches the name of table '{other}'"
                        ),
                    });
                    break;
                }
            }
        }
    }
}

/// A two-part table name whose columns reference both parts marks a
/// candidate junction table. The hint carries no target column; resolution
/// is left to the caller.
fn junction_table_pass(tables: &[(String, &ParseResult)], hints: &mut Vec<RelationshipHint>) {
    for (table, result) in tables {
        let parts: Vec<&str> = table.split(['_', '-']).collect();
        if parts.len() != 2 || parts.iter().any(|part| part.is_empty()) {
            continue;
        }
        let matched: Vec<Option<String>> = parts
            .iter()
            .map(|part| {
                let stem = singularize(part);
                result
                    .headers
                    .iter()
                    .map(|column| column.to_snake_case())
                    .find(|lowered| lowered.contains(&stem) && lowered.contains("id"))
            })
            .collect();
        if let (Some(first), Some(_)) = (&matched[0], &matched[1]) {
            hints.push(RelationshipHint {
                source_table: table.clone(),
                source_column: first.clone(),
                target_table: None,
                target_column: None,
                confidence: 0.8,
                kind: HintKind::ManyToMany,
                reasoning: format!(
                    "'{table}' looks like a junction table linking '{}' and '{}'",
                    pluralize(&singularize(parts[0])),
                    pluralize(&singularize(parts[1]))
                ),
            });
        }
    }
}

fn value_overlap_pass(tables: &[(String, &ParseResult)], hints: &mut Vec<RelationshipHint>) {
    for ((table_a, result_a), (table_b, result_b)) in tables.iter().tuple_combinations() {
        for stats_a in &result_a.columns {
            for stats_b in &result_b.columns {
                if stats_a.name.eq_ignore_ascii_case(&stats_b.name) {
                    continue;
                }
                let smaller = stats_a.unique_values.len().min(stats_b.unique_values.len());
                if smaller == 0 {
                    continue;
                }
                let intersection = stats_a
                    .unique_values
                    .intersection(&stats_b.unique_values)
                    .count();
                let ratio = intersection as f64 / smaller as f64;
                if ratio > OVERLAP_RATIO_THRESHOLD && intersection > OVERLAP_MIN_INTERSECTION {
                    hints.push(RelationshipHint {
                        source_table: table_a.clone(),
                        source_column: stats_a.name.to_snake_case(),
                        target_table: Some(table_b.clone()),
                        target_column: Some(stats_b.name.to_snake_case()),
                        confidence: (ratio * 0.8).min(0.9),
                        kind: HintKind::ForeignKey,
                        reasoning: format!(
                            "{:.0}% of '{}.{}' values also appear in '{}.{}'",
                            ratio * 100.0,
                            table_a,
                            stats_a.name,
                            table_b,
                            stats_b.name
                        ),
                    });
                }
            }
        }
    }
}

fn uuid_shape_ratio(values: &BTreeSet<String>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let uuid_like = values
        .iter()
        .filter(|value| Uuid::parse_str(value.trim()).is_ok())
        .count();
    uuid_like as f64 / values.len() as f64
}

/// Verdict of [`classify_cardinality`].
#[derive(Debug, Clone, Serialize)]
pub struct CardinalityCall {
    pub kind: RelationshipKind,
    pub confidence: f64,
    pub reasoning: String,
}

/// Classifies a relationship's cardinality from the uniqueness ratios of the
/// two column value sets.
pub fn classify_cardinality(source: &ColumnStats, target: &ColumnStats) -> CardinalityCall {
    let source_unique = source.unique_ratio();
    let target_unique = target.unique_ratio();

    if source_unique > 0.9 && target_unique > 0.9 {
        CardinalityCall {
            kind: RelationshipKind::OneToOne,
            confidence: 0.9,
            reasoning: "both columns are nearly unique".to_string(),
        }
    } else if source_unique > 0.9 && target_unique < 0.7 {
        CardinalityCall {
            kind: RelationshipKind::OneToMany,
            confidence: 0.85,
            reasoning: "source values are unique while target values repeat".to_string(),
        }
    } else if source_unique < 0.7 && target_unique < 0.7 {
        CardinalityCall {
            kind: RelationshipKind::ManyToMany,
            confidence: 0.8,
            reasoning: "values repeat on both sides".to_string(),
        }
    } else {
        CardinalityCall {
            kind: RelationshipKind::OneToMany,
            confidence: 0.5,
            reasoning: "default assumption; uniqueness ratios are inconclusive".to_string(),
        }
    }
}

/// Naive English singularization, good enough for table-name conventions.
pub fn singularize(name: &str) -> String {
    let lowered = name.to_ascii_lowercase();
    if let Some(stem) = lowered.strip_suffix("ies")
        && !stem.is_empty()
    {
        return format!("{stem}y");
    }
    for suffix in ["ches", "shes", "xes", "zes", "ses"] {
        if let Some(stem) = lowered.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    if lowered.ends_with('s') && !lowered.ends_with("ss") && lowered.len() > 1 {
        return lowered[..lowered.len() - 1].to_string();
    }
    lowered
}

/// Naive English pluralization, the inverse convention of [`singularize`].
pub fn pluralize(stem: &str) -> String {
    let lowered = stem.to_ascii_lowercase();
    if let Some(prefix) = lowered.strip_suffix('y')
        && !prefix.is_empty()
        && !prefix.ends_with(['a', 'e', 'i', 'o', 'u'])
    {
        return format!("{prefix}ies");
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lowered.ends_with(suffix))
    {
        return format!("{lowered}es");
    }
    format!("{lowered}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularize_handles_common_suffixes() {
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("status"), "statu"); // naive, accepted
        assert_eq!(singularize("class"), "class");
    }

    #[test]
    fn pluralize_inverts_singularize_for_conventions() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("day"), "days");
    }

    #[test]
    fn table_name_strips_extension_and_snake_cases() {
        assert_eq!(table_name_for("Order Items.csv"), "order_items");
        assert_eq!(table_name_for("users.csv"), "users");
        assert_eq!(table_name_for("CustomerAccounts.tsv"), "customer_accounts");
    }
}
