//! Entity descriptors and the per-entity field registry.
//!
//! Every persisted type implements [`Entity`] and exposes a static
//! [`EntityDescriptor`]. The descriptor is the only source of truth for
//! which keys may be written, which names may be sorted or filtered on,
//! and whether rows are soft-deleted. Nothing is discovered at runtime.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::error::AppError;

/// Untyped key/value input, usually a decoded JSON object.
pub type Fields = serde_json::Map<String, Value>;

/// Columns shared by every entity. They are assigned by the store.
pub const BASE_COLUMNS: [&str; 3] = ["id", "created_date", "modified_date"];

/// Storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Boolean,
    Integer,
    Timestamp,
    Uuid,
}

/// A typed value ready to be bound into a query.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Boolean(bool),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl FieldKind {
    /// Converts a JSON value into this kind.
    ///
    /// An empty string is treated as NULL for every kind.
    pub fn convert(self, name: &str, value: &Value) -> Result<FieldValue, AppError> {
        let wrong_type = || AppError::bad_request(format!("Attribute {name} has a wrong type"));

        match value {
            Value::Null => return Ok(FieldValue::Null),
            Value::String(s) if s.is_empty() => return Ok(FieldValue::Null),
            _ => {}
        }

        match self {
            FieldKind::Text => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(wrong_type),
            FieldKind::Boolean => value.as_bool().map(FieldValue::Boolean).ok_or_else(wrong_type),
            FieldKind::Integer => value.as_i64().map(FieldValue::Integer).ok_or_else(wrong_type),
            FieldKind::Timestamp => {
                let raw = value.as_str().ok_or_else(wrong_type)?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|_| wrong_type())
            }
            FieldKind::Uuid => {
                let raw = value.as_str().ok_or_else(wrong_type)?;
                Uuid::parse_str(raw)
                    .map(FieldValue::Uuid)
                    .map_err(|_| wrong_type())
            }
        }
    }
}

/// A scalar column of an entity.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Must be supplied on create.
    pub required: bool,
    pub sortable: bool,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            required: false,
            sortable: true,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self.nullable = false;
        self
    }

    /// Not nullable but has a database default.
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }
}

/// A reference to another entity stored as its id in `column`.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Input key.
    pub name: &'static str,
    /// Local column holding the related id.
    pub column: &'static str,
    /// Table of the related entity.
    pub target: &'static str,
    /// Whether the target table soft-deletes through a `deleted` column.
    pub target_soft_delete: Option<&'static str>,
    pub nullable: bool,
    pub required: bool,
}

/// Virtual sort name expanded into one or more real columns.
#[derive(Debug, Clone, Copy)]
pub struct SortResolver {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Static description of a persisted entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub fields: &'static [Field],
    pub relations: &'static [Relation],
    pub sort_resolvers: &'static [SortResolver],
    /// Sort applied when the caller requests none, in query syntax.
    /// `None` falls back to descending id.
    pub default_sort: Option<&'static str>,
    /// Soft-delete marker column. Rows with a non-NULL marker are hidden
    /// from every live-visibility read.
    pub soft_delete: Option<&'static str>,
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn sort_resolver(&self, name: &str) -> Option<&'static SortResolver> {
        self.sort_resolvers.iter().find(|r| r.name == name)
    }

    /// Real column behind a queryable name: base columns, declared fields
    /// and relation columns.
    pub fn column(&self, name: &str) -> Option<&'static str> {
        if let Some(base) = BASE_COLUMNS.iter().find(|c| **c == name) {
            return Some(base);
        }
        if let Some(field) = self.field(name) {
            return Some(field.name);
        }
        self.relations
            .iter()
            .find(|r| r.column == name || r.name == name)
            .map(|r| r.column)
    }

    /// Columns a sort name expands to, in order.
    pub fn sort_columns(&self, name: &str) -> Option<Vec<&'static str>> {
        if let Some(resolver) = self.sort_resolver(name) {
            return Some(resolver.columns.to_vec());
        }
        if let Some(field) = self.field(name) {
            return field.sortable.then(|| vec![field.name]);
        }
        self.column(name).map(|c| vec![c])
    }
}

/// A validated write of one column.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub column: &'static str,
    pub value: FieldValue,
    /// Set when the value is a reference that must exist in another table.
    pub relation: Option<&'static Relation>,
}

/// Whether input is for a new record or a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// A persisted entity type.
pub trait Entity:
    for<'r> sqlx::FromRow<'r, SqliteRow> + Clone + Send + Sync + Unpin + 'static
{
    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> Uuid;

    /// Typed setter hook, run for every scalar field after conversion.
    fn prepare(field: &Field, value: FieldValue) -> Result<FieldValue, AppError> {
        let _ = field;
        Ok(value)
    }
}

/// Fails with [`AppError::UnknownField`] naming every key of `input` that is
/// neither a column nor a relation of `E`.
pub fn reject_unknown<E: Entity>(input: &Fields) -> Result<(), AppError> {
    let descriptor = E::descriptor();
    let unknown: Vec<&str> = input
        .keys()
        .map(String::as_str)
        .filter(|k| {
            descriptor.field(k).is_none()
                && descriptor.relation(k).is_none()
                && !BASE_COLUMNS.contains(k)
        })
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AppError::unknown_fields(unknown))
    }
}

/// Validates untyped input against the registry of `E`.
///
/// Every key must be a declared field or relation. All unknown keys are
/// reported together. Base columns are read-only.
///
/// # Errors
///
/// - [`AppError::UnknownField`] naming every unrecognised key
/// - [`AppError::BadRequest`] for read-only keys, wrong types, NULLs in
///   non-nullable fields and, on create, missing required fields
pub fn populate<E: Entity>(input: &Fields, mode: WriteMode) -> Result<Vec<Assignment>, AppError> {
    let descriptor = E::descriptor();

    reject_unknown::<E>(input)?;

    let read_only: Vec<&str> = input
        .keys()
        .map(String::as_str)
        .filter(|k| BASE_COLUMNS.contains(k))
        .collect();
    if !read_only.is_empty() {
        return Err(AppError::bad_request(format!(
            "Read-only attributes: {}",
            read_only.join(", ")
        )));
    }

    let mut assignments = Vec::with_capacity(input.len());

    for relation in descriptor.relations {
        let Some(raw) = input.get(relation.name) else {
            continue;
        };
        let value = FieldKind::Uuid.convert(relation.name, raw)?;
        if value.is_null() && !relation.nullable {
            return Err(AppError::bad_request(format!(
                "Attribute {} can't be empty",
                relation.name
            )));
        }
        assignments.push(Assignment {
            column: relation.column,
            value,
            relation: Some(relation),
        });
    }

    for field in descriptor.fields {
        let Some(raw) = input.get(field.name) else {
            continue;
        };
        let value = field.kind.convert(field.name, raw)?;
        if value.is_null() && !field.nullable {
            return Err(AppError::bad_request(format!(
                "Attribute {} can't be empty",
                field.name
            )));
        }
        let value = if value.is_null() {
            value
        } else {
            E::prepare(field, value)?
        };
        assignments.push(Assignment {
            column: field.name,
            value,
            relation: None,
        });
    }

    if mode == WriteMode::Create {
        let mut missing: Vec<&str> = descriptor
            .fields
            .iter()
            .filter(|f| f.required && !input.contains_key(f.name))
            .map(|f| f.name)
            .collect();
        missing.extend(
            descriptor
                .relations
                .iter()
                .filter(|r| r.required && !input.contains_key(r.name))
                .map(|r| r.name),
        );
        if !missing.is_empty() {
            return Err(AppError::bad_request(format!(
                "Missing required attributes: {}",
                missing.join(", ")
            )));
        }
    }

    Ok(assignments)
}
