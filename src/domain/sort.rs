//! Sort specifications.
//!
//! A sort specification is parsed from the `sort` query parameter, e.g.
//! `-name:last,email`. Each item carries a field name, a direction and a
//! null placement. Field names are resolved against an entity descriptor by
//! the record store, never here.

use std::fmt;

use crate::error::AppError;

/// Ordering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Where NULL values land in the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

impl Nulls {
    pub fn as_sql(self) -> &'static str {
        match self {
            Nulls::First => "NULLS FIRST",
            Nulls::Last => "NULLS LAST",
        }
    }
}

/// One requested sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortItem {
    pub field: String,
    pub direction: Direction,
    pub nulls: Nulls,
}

impl SortItem {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
            nulls: Nulls::First,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
            nulls: Nulls::First,
        }
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Nulls::Last;
        self
    }
}

impl fmt::Display for SortItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == Direction::Desc {
            f.write_str("-")?;
        }
        f.write_str(&self.field)?;
        if self.nulls == Nulls::Last {
            f.write_str(":last")?;
        }
        Ok(())
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    items: Vec<SortItem>,
}

impl SortSpec {
    pub fn new(items: Vec<SortItem>) -> Self {
        Self { items }
    }

    /// Parses the comma-separated query syntax.
    ///
    /// - a leading `-` sorts descending
    /// - a `:last` suffix pushes NULLs to the end (`:first` is the default)
    /// - `id` is accepted case-insensitively
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] for empty items or an unknown suffix.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut items = Vec::new();

        for part in raw.split(',') {
            let part = part.trim();
            let (direction, rest) = match part.strip_prefix('-') {
                Some(rest) => (Direction::Desc, rest),
                None => (Direction::Asc, part),
            };

            let (name, nulls) = match rest.split_once(':') {
                None => (rest, Nulls::First),
                Some((name, placement)) => {
                    let nulls = if placement.eq_ignore_ascii_case("last") {
                        Nulls::Last
                    } else if placement.eq_ignore_ascii_case("first") {
                        Nulls::First
                    } else {
                        return Err(AppError::bad_request(format!(
                            "Unknown null placement '{placement}' in sort"
                        )));
                    };
                    (name, nulls)
                }
            };

            if name.is_empty() {
                return Err(AppError::bad_request("Empty field name in sort"));
            }

            let field = if name.eq_ignore_ascii_case("id") {
                "id".to_string()
            } else {
                name.to_string()
            };

            items.push(SortItem {
                field,
                direction,
                nulls,
            });
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[SortItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// A concrete `ORDER BY` term on a real column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub direction: Direction,
    pub nulls: Nulls,
}

impl OrderTerm {
    pub fn to_sql(&self) -> String {
        format!(
            "{} {} {}",
            self.column,
            self.direction.as_sql(),
            self.nulls.as_sql()
        )
    }
}
