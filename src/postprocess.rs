//! Name-heuristic type correction pass.
//!
//! Repairs schemas produced by noisy upstream sources (model-generated
//! drafts, hand edits) whose column types contradict naming conventions:
//! `id` columns that are not UUIDs, `created_at` columns typed as text, and
//! so on. The pass works on a deep copy, never touches sampled data, and is
//! idempotent: a column already matching its target type is left alone.

use serde::Serialize;

use crate::model::{Column, DatabaseSchema, PgType};

/// One applied correction, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct Correction {
    pub table: String,
    pub column: String,
    pub from: PgType,
    pub to: PgType,
}

/// The corrected schema copy plus the corrections that were applied.
#[derive(Debug)]
pub struct PostProcessOutcome {
    pub schema: DatabaseSchema,
    pub corrections: Vec<Correction>,
}

impl PostProcessOutcome {
    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }
}

/// Applies every naming rule to a deep copy of the schema and returns it.
/// The input is never mutated; running the pass twice changes nothing on the
/// second run.
pub fn post_process_schema_types(schema: &DatabaseSchema) -> PostProcessOutcome {
    let mut corrected = schema.clone();
    let mut corrections = Vec::new();

    for table in &mut corrected.tables {
        let table_name = table.name.clone();
        for column in &mut table.columns {
            if let Some((target, length, precision, scale)) = target_type_for(column) {
                corrections.push(Correction {
                    table: table_name.clone(),
                    column: column.name.clone(),
                    from: column.datatype,
                    to: target,
                });
                column.datatype = target;
                column.length = length;
                column.precision = precision;
                column.scale = scale;
            }
        }
    }

    PostProcessOutcome {
        schema: corrected,
        corrections,
    }
}

type TargetSpec = (PgType, Option<u32>, Option<u32>, Option<u32>);

/// First matching rule wins; `None` when the column already conforms or no
/// rule applies.
fn target_type_for(column: &Column) -> Option<TargetSpec> {
    let name = column.name.to_ascii_lowercase();
    let current = column.datatype;

    if name == "id" {
        return (current != PgType::Uuid).then_some((PgType::Uuid, None, None, None));
    }
    if name.ends_with("_id") {
        return (current != PgType::Uuid).then_some((PgType::Uuid, None, None, None));
    }
    if name == "created_at" || name == "updated_at" {
        return (current != PgType::Timestamptz)
            .then_some((PgType::Timestamptz, None, None, None));
    }

    let is_text = current == PgType::Text;
    if is_text
        && ["latitude", "longitude", "lat", "lng", "lon"]
            .iter()
            .any(|token| name.contains(token))
    {
        return Some((PgType::Numeric, None, Some(10), Some(6)));
    }
    if is_text && name.contains("year") && !name.contains("built") && !name.contains("constructed")
    {
        return Some((PgType::Smallint, None, None, None));
    }
    if is_text
        && (name.starts_with("is_")
            || name.starts_with("has_")
            || name.starts_with("can_")
            || name.contains("active")
            || name.contains("enabled")
            || name.ends_with("_flag"))
    {
        return Some((PgType::Boolean, None, None, None));
    }
    if is_text && name.contains("email") {
        return Some((PgType::Varchar, Some(255), None, None));
    }
    if is_text
        && ["count", "quantity", "total", "num_"]
            .iter()
            .any(|token| name.contains(token))
    {
        return Some((PgType::Integer, None, None, None));
    }
    if matches!(current, PgType::Varchar | PgType::Char)
        && ["price", "cost", "value", "amount", "fee", "rate"]
            .iter()
            .any(|token| name.contains(token))
    {
        return Some((PgType::Numeric, None, Some(10), Some(2)));
    }

    None
}
