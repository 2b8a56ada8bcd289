//! Filter predicates and list queries for the record store.

use sqlx::{QueryBuilder, Sqlite};

use crate::domain::entity::{EntityDescriptor, FieldValue};
use crate::domain::page::PageWindow;
use crate::domain::sort::SortSpec;
use crate::error::AppError;

/// A single condition on a named column. Lists of predicates are combined
/// with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, FieldValue),
    Ne(String, FieldValue),
    Lt(String, FieldValue),
    Gt(String, FieldValue),
    IsNull(String),
    NotNull(String),
    In(String, Vec<FieldValue>),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn ne(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Ne(column.into(), value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Lt(column.into(), value.into())
    }

    pub fn gt(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Gt(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull(column.into())
    }

    pub fn is_in<V: Into<FieldValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq(c, _)
            | Predicate::Ne(c, _)
            | Predicate::Lt(c, _)
            | Predicate::Gt(c, _)
            | Predicate::IsNull(c)
            | Predicate::NotNull(c)
            | Predicate::In(c, _) => c,
        }
    }
}

/// What to list: a page window, an optional sort and filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub window: PageWindow,
    pub sort: Option<SortSpec>,
    pub filters: Vec<Predicate>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            window: PageWindow::unlimited(),
            sort: None,
            filters: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(mut self, window: PageWindow) -> Self {
        self.window = window;
        self
    }

    pub fn sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }
}

/// Binds a typed value as a query argument.
pub(crate) fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: FieldValue) {
    match value {
        FieldValue::Null => qb.push("NULL"),
        FieldValue::Text(v) => qb.push_bind(v),
        FieldValue::Boolean(v) => qb.push_bind(v),
        FieldValue::Integer(v) => qb.push_bind(v),
        FieldValue::Timestamp(v) => qb.push_bind(v),
        FieldValue::Uuid(v) => qb.push_bind(v),
    };
}

/// Resolves every predicate column against the descriptor.
///
/// # Errors
///
/// [`AppError::UnknownField`] naming every column the entity does not have.
pub(crate) fn resolve_filters(
    descriptor: &EntityDescriptor,
    filters: &[Predicate],
) -> Result<Vec<(&'static str, Predicate)>, AppError> {
    let unknown: Vec<&str> = filters
        .iter()
        .map(Predicate::column)
        .filter(|c| descriptor.column(c).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::unknown_fields(unknown));
    }

    Ok(filters
        .iter()
        .filter_map(|p| descriptor.column(p.column()).map(|c| (c, p.clone())))
        .collect())
}

/// Appends ` AND <predicate>` for every resolved predicate.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: Vec<(&'static str, Predicate)>) {
    for (column, predicate) in filters {
        qb.push(" AND ");
        match predicate {
            // `= NULL` never matches in SQL.
            Predicate::Eq(_, FieldValue::Null) => {
                qb.push(column).push(" IS NULL");
            }
            Predicate::Ne(_, FieldValue::Null) => {
                qb.push(column).push(" IS NOT NULL");
            }
            Predicate::Eq(_, v) => {
                qb.push(column).push(" = ");
                push_value(qb, v);
            }
            Predicate::Ne(_, v) => {
                qb.push(column).push(" <> ");
                push_value(qb, v);
            }
            Predicate::Lt(_, v) => {
                qb.push(column).push(" < ");
                push_value(qb, v);
            }
            Predicate::Gt(_, v) => {
                qb.push(column).push(" > ");
                push_value(qb, v);
            }
            Predicate::IsNull(_) => {
                qb.push(column).push(" IS NULL");
            }
            Predicate::NotNull(_) => {
                qb.push(column).push(" IS NOT NULL");
            }
            Predicate::In(_, values) if values.is_empty() => {
                qb.push("1 = 0");
            }
            Predicate::In(_, values) => {
                qb.push(column).push(" IN (");
                for (i, v) in values.into_iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    push_value(qb, v);
                }
                qb.push(")");
            }
        }
    }
}
