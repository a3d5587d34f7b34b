//! Per-column storage type inference.
//!
//! [`infer_column_type`] classifies every distinct non-null value of a column
//! (pattern first-match with a fixed confidence weight per pattern), scores
//! candidate types by `(occurrences / total) * average confidence`, and picks
//! the winner. Confidence is capped so a unanimous verdict from a handful of
//! samples never reads as more reliable than 95%.
//!
//! The reasoning string is contract output, not logging: downstream UIs
//! display it verbatim next to the proposed column.

use std::{collections::BTreeMap, str::FromStr, sync::LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    model::{Constraint, DEFAULT_VARCHAR_LENGTH, MAX_VARCHAR_LENGTH, PgType},
    parse::ColumnStats,
};

pub const MAX_NUMERIC_PRECISION: u32 = 38;
pub const MAX_NUMERIC_SCALE: u32 = 8;

/// Fraction of values that must share a shape (email, phone, URL) before a
/// CHECK constraint is suggested for it.
const SHAPE_CONSTRAINT_THRESHOLD: f64 = 0.8;
/// Aggregate confidence ceiling.
const CONFIDENCE_CAP: f64 = 0.95;
/// Examples surfaced in the inference result.
const EXAMPLE_LIMIT: usize = 5;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ().\-]{5,18}[0-9]$").expect("phone regex"));
static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer regex"));
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+\.[0-9]+$").expect("decimal regex"));

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "yes", "no", "1", "0", "y", "n"];

/// Value shapes that refine a textual column with a CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    Email,
    Phone,
    Url,
}

impl ValueShape {
    fn noun(&self) -> &'static str {
        match self {
            ValueShape::Email => "email addresses",
            ValueShape::Phone => "phone numbers",
            ValueShape::Url => "URLs",
        }
    }

    fn check_expression(&self, column: &str) -> String {
        match self {
            ValueShape::Email => {
                format!(r"{column} ~* '^[^@\s]+@[^@\s]+\.[^@\s]+$'")
            }
            ValueShape::Phone => format!(r"{column} ~ '^\+?[0-9 ().-]+$'"),
            ValueShape::Url => format!("{column} ~* '^https?://'"),
        }
    }
}

/// Classification of a single cell value.
#[derive(Debug, Clone, Copy)]
struct ValueClass {
    datatype: PgType,
    confidence: f64,
    shape: Option<ValueShape>,
    precision: Option<u32>,
    scale: Option<u32>,
}

impl ValueClass {
    fn plain(datatype: PgType, confidence: f64) -> Self {
        Self {
            datatype,
            confidence,
            shape: None,
            precision: None,
            scale: None,
        }
    }

    fn shaped(datatype: PgType, confidence: f64, shape: ValueShape) -> Self {
        Self {
            shape: Some(shape),
            ..Self::plain(datatype, confidence)
        }
    }
}

/// First-match-wins per-value classifier.
fn classify_value(value: &str) -> ValueClass {
    let trimmed = value.trim();
    let braceless = trimmed.trim_matches(|c| matches!(c, '{' | '}'));

    if trimmed.contains('-') && Uuid::parse_str(braceless).is_ok() {
        return ValueClass::plain(PgType::Uuid, 0.95);
    }
    if BOOLEAN_TOKENS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return ValueClass::plain(PgType::Boolean, 0.9);
    }
    if EMAIL_RE.is_match(trimmed) {
        return ValueClass::shaped(PgType::Varchar, 0.9, ValueShape::Email);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return ValueClass::shaped(PgType::Varchar, 0.85, ValueShape::Url);
    }
    if PHONE_RE.is_match(trimmed) && !INTEGER_RE.is_match(trimmed) {
        return ValueClass::shaped(PgType::Varchar, 0.8, ValueShape::Phone);
    }
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return ValueClass::plain(PgType::Jsonb, 0.9);
    }
    if INTEGER_RE.is_match(trimmed) {
        return ValueClass::plain(classify_integer(trimmed), 0.9);
    }
    if DECIMAL_RE.is_match(trimmed) {
        let (precision, scale) = decimal_shape(trimmed);
        let mut class = ValueClass::plain(PgType::Numeric, 0.85);
        class.precision = Some(precision);
        class.scale = Some(scale);
        return class;
    }
    if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok() {
        return ValueClass::plain(PgType::Date, 0.85);
    }
    if DateTime::parse_from_rfc3339(trimmed).is_ok() {
        return ValueClass::plain(PgType::Timestamptz, 0.85);
    }
    if parse_naive_datetime(trimmed).is_ok() {
        return ValueClass::plain(PgType::Timestamp, 0.85);
    }
    ValueClass::plain(PgType::Varchar, 0.5)
}

fn classify_integer(token: &str) -> PgType {
    match token.parse::<i64>() {
        Ok(v) if (-32768..=32767).contains(&v) => PgType::Smallint,
        Ok(v) if (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&v) => PgType::Integer,
        // Larger than i32, or too many digits for i64 entirely.
        _ => PgType::Bigint,
    }
}

/// Precision (total digits, capped at 38) and scale (fractional digits,
/// capped at 8) of a decimal token.
fn decimal_shape(token: &str) -> (u32, u32) {
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count() as u32;
    let scale = match Decimal::from_str(token) {
        Ok(decimal) => decimal.scale(),
        // Beyond rust_decimal's 28-digit mantissa; fall back to counting.
        Err(_) => token
            .rsplit_once('.')
            .map(|(_, frac)| frac.len() as u32)
            .unwrap_or(0),
    };
    (
        digits.min(MAX_NUMERIC_PRECISION),
        scale.min(MAX_NUMERIC_SCALE),
    )
}

fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
}

/// Result of inferring one column's storage type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeInference {
    pub datatype: PgType,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    pub examples: Vec<String>,
}

#[derive(Debug, Default)]
struct TypeTally {
    count: usize,
    confidence_sum: f64,
    max_precision: u32,
    max_scale: u32,
}

/// Infers the storage type for one column from its sampled statistics.
///
/// Pure and deterministic: the same [`ColumnStats`] always produces the same
/// result. A column with zero non-null values falls back to VARCHAR at
/// confidence 0.1 rather than failing.
pub fn infer_column_type(stats: &ColumnStats) -> TypeInference {
    let examples: Vec<String> = stats
        .sample_values
        .iter()
        .take(EXAMPLE_LIMIT)
        .cloned()
        .collect();

    if stats.unique_values.is_empty() {
        return TypeInference {
            datatype: PgType::Varchar,
            confidence: 0.1,
            reasoning: "all values null/empty; defaulting to varchar".to_string(),
            length: Some(DEFAULT_VARCHAR_LENGTH),
            precision: None,
            scale: None,
            constraints: Vec::new(),
            examples,
        };
    }

    // Tallies keyed in first-seen order over the sorted distinct set, which
    // keeps tie-breaking deterministic.
    let mut order: Vec<PgType> = Vec::new();
    let mut tallies: BTreeMap<&'static str, TypeTally> = BTreeMap::new();
    let mut shape_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut dominant_shape: Option<ValueShape> = None;
    let mut max_len = 0u32;

    let total = stats.unique_values.len();
    for value in &stats.unique_values {
        max_len = max_len.max(value.chars().count() as u32);
        let class = classify_value(value);
        if !order.contains(&class.datatype) {
            order.push(class.datatype);
        }
        let tally = tallies.entry(class.datatype.as_str()).or_default();
        tally.count += 1;
        tally.confidence_sum += class.confidence;
        if let Some(precision) = class.precision {
            tally.max_precision = tally.max_precision.max(precision);
        }
        if let Some(scale) = class.scale {
            tally.max_scale = tally.max_scale.max(scale);
        }
        if let Some(shape) = class.shape {
            let seen = shape_counts.entry(shape.noun()).or_insert(0);
            *seen += 1;
            if *seen as f64 / total as f64 >= SHAPE_CONSTRAINT_THRESHOLD {
                dominant_shape = Some(shape);
            }
        }
    }

    let mut winner = order[0];
    let mut best_score = 0.0f64;
    for datatype in &order {
        let tally = &tallies[datatype.as_str()];
        let score = tally.confidence_sum / total as f64;
        if score > best_score {
            best_score = score;
            winner = *datatype;
        }
    }

    let winner_tally = &tallies[winner.as_str()];
    let consistency = winner_tally.count as f64 / total as f64;
    let confidence = (best_score * consistency).min(CONFIDENCE_CAP);

    let mut reasoning = format!(
        "{winner} matched {}/{} distinct value(s) ({:.0}% consistent)",
        winner_tally.count,
        total,
        consistency * 100.0
    );

    let mut constraints = Vec::new();
    let mut length = None;
    let mut precision = None;
    let mut scale = None;

    match winner {
        PgType::Varchar => {
            let suggested = ((f64::from(max_len) * 1.2).ceil() as u32)
                .max(DEFAULT_VARCHAR_LENGTH)
                .min(MAX_VARCHAR_LENGTH);
            length = Some(suggested);
            if let Some(shape) = dominant_shape {
                constraints.push(Constraint::Check {
                    expression: shape.check_expression(&stats.name),
                });
                reasoning.push_str(&format!("; values look like {}", shape.noun()));
            }
        }
        PgType::Numeric => {
            precision = Some(winner_tally.max_precision.max(1));
            scale = Some(winner_tally.max_scale);
        }
        _ => {}
    }

    // Candidate enum: few repeated values across many rows.
    let unique_count = stats.unique_values.len();
    if stats.unique_ratio() < 0.1 && (2..=10).contains(&unique_count) {
        constraints.push(Constraint::Check {
            expression: check_in_expression(&stats.name, winner, &stats.unique_values),
        });
        reasoning.push_str(&format!(
            "; low-cardinality value set ({unique_count} distinct)"
        ));
    }

    if stats.null_ratio() < 0.01 && stats.null_count <= 2 {
        constraints.push(Constraint::NotNull);
    }
    if stats.unique_ratio() > 0.95 && stats.total_count > 10 {
        constraints.push(Constraint::Unique);
    }

    TypeInference {
        datatype: winner,
        confidence,
        reasoning,
        length,
        precision,
        scale,
        constraints,
        examples,
    }
}

/// Infers every column, keyed by column name.
pub fn analyze_all_columns(columns: &[ColumnStats]) -> BTreeMap<String, TypeInference> {
    columns
        .iter()
        .map(|stats| (stats.name.clone(), infer_column_type(stats)))
        .collect()
}

fn check_in_expression(
    column: &str,
    datatype: PgType,
    values: &std::collections::BTreeSet<String>,
) -> String {
    let rendered: Vec<String> = values
        .iter()
        .map(|value| {
            if datatype.is_numeric() || datatype == PgType::Boolean {
                value.clone()
            } else {
                format!("'{}'", value.replace('\'', "''"))
            }
        })
        .collect();
    format!("{column} IN ({})", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_value_orders_patterns() {
        assert_eq!(
            classify_value("550e8400-e29b-41d4-a716-446655440000").datatype,
            PgType::Uuid
        );
        // Boolean tokens win over integers by classification order.
        assert_eq!(classify_value("1").datatype, PgType::Boolean);
        assert_eq!(classify_value("Yes").datatype, PgType::Boolean);
        assert_eq!(classify_value("bob@example.com").datatype, PgType::Varchar);
        assert!(matches!(
            classify_value("https://example.com/x").shape,
            Some(ValueShape::Url)
        ));
        assert_eq!(classify_value("+44 20 7946 0958").datatype, PgType::Varchar);
        assert_eq!(classify_value(r#"{"a": 1}"#).datatype, PgType::Jsonb);
        assert_eq!(classify_value("12000").datatype, PgType::Smallint);
        assert_eq!(classify_value("100000").datatype, PgType::Integer);
        assert_eq!(classify_value("3000000000").datatype, PgType::Bigint);
        assert_eq!(classify_value("12.50").datatype, PgType::Numeric);
        assert_eq!(classify_value("2024-05-06").datatype, PgType::Date);
        assert_eq!(
            classify_value("2024-05-06T14:30:00Z").datatype,
            PgType::Timestamptz
        );
        assert_eq!(
            classify_value("2024-05-06 14:30:00").datatype,
            PgType::Timestamp
        );
        assert_eq!(classify_value("hello world").datatype, PgType::Varchar);
    }

    #[test]
    fn decimal_shape_counts_digits_and_scale() {
        assert_eq!(decimal_shape("12.50"), (4, 2));
        assert_eq!(decimal_shape("0.123456789"), (10, 8));
    }
}
