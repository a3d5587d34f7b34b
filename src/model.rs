//! Canonical schema data model.
//!
//! Everything downstream of inference reads and writes these types: the
//! [`DatabaseSchema`] aggregate with its [`Table`], [`Column`],
//! [`Relationship`], [`Index`], and [`RlsPolicy`] members. The model is a
//! plain serializable value (JSON or YAML on disk) so editors, migration
//! generators, and seeders can consume it without linking this crate's
//! inference machinery.
//!
//! The model is deliberately permissive: a draft table may hold two
//! primary-key columns or a dangling relationship while it is being edited.
//! Structural rules live in [`crate::validate`], not here.

use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// PostgreSQL limit on identifier bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;
/// Upper bound accepted for an explicit VARCHAR length.
pub const MAX_VARCHAR_LENGTH: u32 = 65535;
/// Length assigned to VARCHAR columns when inference has nothing better.
pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// Storage types emitted by inference and accepted by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PgType {
    Uuid,
    Varchar,
    Char,
    Text,
    Smallint,
    Integer,
    Bigint,
    Numeric,
    Boolean,
    Date,
    Timestamp,
    Timestamptz,
    Jsonb,
}

impl PgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PgType::Uuid => "uuid",
            PgType::Varchar => "varchar",
            PgType::Char => "char",
            PgType::Text => "text",
            PgType::Smallint => "smallint",
            PgType::Integer => "integer",
            PgType::Bigint => "bigint",
            PgType::Numeric => "numeric",
            PgType::Boolean => "boolean",
            PgType::Date => "date",
            PgType::Timestamp => "timestamp",
            PgType::Timestamptz => "timestamptz",
            PgType::Jsonb => "jsonb",
        }
    }

    /// Bounded string types that should carry an explicit length.
    pub fn is_bounded_text(&self) -> bool {
        matches!(self, PgType::Varchar | PgType::Char)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, PgType::Varchar | PgType::Char | PgType::Text)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PgType::Smallint | PgType::Integer | PgType::Bigint | PgType::Numeric
        )
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "uuid",
            "varchar",
            "char",
            "text",
            "smallint",
            "integer",
            "bigint",
            "numeric",
            "boolean",
            "date",
            "timestamp",
            "timestamptz",
            "jsonb",
        ]
    }
}

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PgType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "uuid" | "guid" => Ok(PgType::Uuid),
            "varchar" | "character varying" => Ok(PgType::Varchar),
            "char" | "character" => Ok(PgType::Char),
            "text" | "string" => Ok(PgType::Text),
            "smallint" | "int2" => Ok(PgType::Smallint),
            "integer" | "int" | "int4" => Ok(PgType::Integer),
            "bigint" | "int8" => Ok(PgType::Bigint),
            "numeric" | "decimal" => Ok(PgType::Numeric),
            "boolean" | "bool" => Ok(PgType::Boolean),
            "date" => Ok(PgType::Date),
            "timestamp" => Ok(PgType::Timestamp),
            "timestamptz" | "timestamp with time zone" => Ok(PgType::Timestamptz),
            "jsonb" | "json" => Ok(PgType::Jsonb),
            _ => Err(anyhow!(
                "Unknown storage type '{value}'. Supported types: {}",
                PgType::variants().join(", ")
            )),
        }
    }
}

/// Referential action attached to a foreign key or relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

/// A column-level constraint. `kind` tags the variant on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey,
    ForeignKey {
        referenced_table: String,
        referenced_column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<ReferentialAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_update: Option<ReferentialAction>,
    },
    Unique,
    NotNull,
    Check {
        expression: String,
    },
    Default {
        expression: String,
    },
}

impl Constraint {
    pub fn describe(&self) -> String {
        match self {
            Constraint::PrimaryKey => "PRIMARY KEY".to_string(),
            Constraint::ForeignKey {
                referenced_table,
                referenced_column,
                ..
            } => format!("REFERENCES {referenced_table}({referenced_column})"),
            Constraint::Unique => "UNIQUE".to_string(),
            Constraint::NotNull => "NOT NULL".to_string(),
            Constraint::Check { expression } => format!("CHECK ({expression})"),
            Constraint::Default { expression } => format!("DEFAULT {expression}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: Uuid,
    pub name: String,
    pub datatype: PgType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: PgType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            datatype,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            default_value: None,
            constraints: Vec::new(),
            comment: None,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::PrimaryKey))
    }

    pub fn has_not_null(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::NotNull))
    }

    /// Marks the column as the table's primary key, forcing NOT NULL.
    pub fn promote_to_primary_key(&mut self) {
        if !self.is_primary_key() {
            self.constraints.insert(0, Constraint::PrimaryKey);
        }
        if !self.has_not_null() {
            self.constraints.push(Constraint::NotNull);
        }
        self.nullable = false;
    }
}

/// Layout hint consumed by visual editors; inference assigns defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub id: Uuid,
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub id: Uuid,
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub position: Position,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            comment: None,
            position: Position::default(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// First column carrying a PRIMARY KEY constraint, if any.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            RelationshipKind::OneToOne => "one-to-one",
            RelationshipKind::OneToMany => "one-to-many",
            RelationshipKind::ManyToMany => "many-to-many",
        };
        write!(f, "{token}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

/// Command a row-access policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCommand {
    All,
    Select,
    Insert,
    Update,
    Delete,
}

/// Row-access policy descriptor. Opaque to inference; carried through so
/// exporters can render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlsPolicy {
    pub id: Uuid,
    pub table_name: String,
    pub name: String,
    pub command: PolicyCommand,
    #[serde(default, rename = "using", skip_serializing_if = "Option::is_none")]
    pub using_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub id: Uuid,
    pub name: String,
    pub tables: Vec<Table>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rls_policies: Vec<RlsPolicy>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl DatabaseSchema {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tables: Vec::new(),
            relationships: Vec::new(),
            rls_policies: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            project_id: None,
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Bumps `updated_at`; call after edits when the value leaves this crate.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Loads a schema from JSON or YAML, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        if is_yaml_path(path) {
            serde_yaml::from_reader(reader).context("Parsing schema YAML")
        } else {
            serde_json::from_reader(reader).context("Parsing schema JSON")
        }
    }

    /// Writes the schema to JSON or YAML, chosen by file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        if is_yaml_path(path) {
            serde_yaml::to_writer(file, self).context("Writing schema YAML")
        } else {
            serde_json::to_writer_pretty(file, self).context("Writing schema JSON")
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Serializing schema to JSON")
    }
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
    )
}
