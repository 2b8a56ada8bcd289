//! Generic CRUD and query building over any [`Entity`].
//!
//! A [`RecordStore`] borrows one connection (normally the request's
//! transaction) and is cheap to create per call site. Every statement is
//! assembled with [`QueryBuilder`] from the entity's static descriptor, so
//! only declared column names ever reach SQL text; values are always bound.
//!
//! Entities declaring a soft-delete column are restricted to live rows on
//! every read and write. [`RecordStore::including_deleted`] is the only way
//! to see deleted rows.

use std::collections::HashMap;
use std::marker::PhantomData;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::domain::entity::{Assignment, Entity, Fields, WriteMode, populate};
use crate::domain::sort::{Direction, Nulls, OrderTerm, SortItem, SortSpec};
use crate::error::AppError;

use super::query::{ListQuery, push_filters, push_value, resolve_filters};

/// Which rows of a soft-deleting entity are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Live,
    IncludingDeleted,
}

pub struct RecordStore<'c, E: Entity> {
    conn: &'c mut SqliteConnection,
    visibility: Visibility,
    _entity: PhantomData<E>,
}

impl<'c, E: Entity> RecordStore<'c, E> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self {
            conn,
            visibility: Visibility::Live,
            _entity: PhantomData,
        }
    }

    /// Escape hatch for administrative paths: makes soft-deleted rows
    /// visible to reads, updates and [`restore`](Self::restore).
    pub fn including_deleted(mut self) -> Self {
        self.visibility = Visibility::IncludingDeleted;
        self
    }

    /// `SELECT * FROM <table> WHERE 1 = 1 [AND <live>]`
    fn select(&self) -> QueryBuilder<'static, Sqlite> {
        let descriptor = E::descriptor();
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1 = 1", descriptor.table));
        self.push_live(&mut qb);
        qb
    }

    fn push_live(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if self.visibility == Visibility::Live
            && let Some(marker) = E::descriptor().soft_delete
        {
            qb.push(" AND ").push(marker).push(" IS NULL");
        }
    }

    /// Inserts a new row from untyped input.
    ///
    /// Assigns the id and both timestamps, validates the input against the
    /// entity's registry and returns the stored row.
    ///
    /// # Errors
    ///
    /// - [`AppError::UnknownField`] for keys that are not fields or relations
    /// - [`AppError::BadRequest`] for invalid values and dangling relations
    pub async fn create(&mut self, fields: &Fields) -> Result<E, AppError> {
        let assignments = populate::<E>(fields, WriteMode::Create)?;
        self.check_relations(&assignments).await?;

        let descriptor = E::descriptor();
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("INSERT INTO ");
        qb.push(descriptor.table)
            .push(" (id, created_date, modified_date");
        for a in &assignments {
            qb.push(", ").push(a.column);
        }
        qb.push(") VALUES (");
        qb.push_bind(id).push(", ");
        qb.push_bind(now).push(", ");
        qb.push_bind(now);
        for a in assignments {
            qb.push(", ");
            push_value(&mut qb, a.value);
        }
        qb.push(") RETURNING *");

        let record = qb.build_query_as::<E>().fetch_one(&mut *self.conn).await?;

        tracing::debug!(table = descriptor.table, %id, "Record created");
        Ok(record)
    }

    /// Fetches one row by id.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] if no visible row has this id.
    pub async fn get(&mut self, id: Uuid) -> Result<E, AppError> {
        self.get_optional(id).await?.ok_or(AppError::NotFound(None))
    }

    pub async fn get_optional(&mut self, id: Uuid) -> Result<Option<E>, AppError> {
        let mut qb = self.select();
        qb.push(" AND id = ").push_bind(id);
        Ok(qb.build_query_as::<E>().fetch_optional(&mut *self.conn).await?)
    }

    /// Fetches rows for `ids`, in input order.
    ///
    /// Ids without a visible row are skipped. A repeated id yields one entry
    /// per occurrence. An empty input returns without touching the database.
    pub async fn find(&mut self, ids: &[Uuid]) -> Result<Vec<E>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = self.select();
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let rows = qb.build_query_as::<E>().fetch_all(&mut *self.conn).await?;
        let by_id: HashMap<Uuid, E> = rows.into_iter().map(|r| (r.id(), r)).collect();

        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    /// Resolves a sort specification into concrete ORDER BY terms.
    ///
    /// Virtual names expand into several columns that all inherit the
    /// requested direction and null placement. Without a specification the
    /// entity's default sort applies, or descending id. A final `id ASC`
    /// term keeps the order deterministic.
    ///
    /// # Errors
    ///
    /// [`AppError::BadRequest`] listing every name the entity cannot sort on.
    pub fn set_sort(sort: Option<&SortSpec>) -> Result<Vec<OrderTerm>, AppError> {
        let descriptor = E::descriptor();

        let default_spec;
        let spec = match sort.filter(|s| !s.is_empty()) {
            Some(spec) => spec,
            None => {
                default_spec = match descriptor.default_sort {
                    Some(raw) => SortSpec::parse(raw)?,
                    None => SortSpec::new(vec![SortItem::desc("id")]),
                };
                &default_spec
            }
        };

        let unknown: Vec<&str> = spec
            .items()
            .iter()
            .filter(|item| descriptor.sort_columns(&item.field).is_none())
            .map(|item| item.field.as_str())
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::bad_request(format!(
                "Unknown sort fields: {}",
                unknown.join(", ")
            )));
        }

        let mut terms: Vec<OrderTerm> = Vec::new();
        for item in spec.items() {
            for column in descriptor.sort_columns(&item.field).unwrap_or_default() {
                terms.push(OrderTerm {
                    column,
                    direction: item.direction,
                    nulls: item.nulls,
                });
            }
        }

        if !terms.iter().any(|t| t.column == "id") {
            terms.push(OrderTerm {
                column: "id",
                direction: Direction::Asc,
                nulls: Nulls::First,
            });
        }

        Ok(terms)
    }

    /// Lists rows: filters first, then sort, then the page window.
    ///
    /// # Errors
    ///
    /// - [`AppError::BadRequest`] for unknown sort names, before any query
    /// - [`AppError::UnknownField`] for unknown filter columns
    pub async fn all(&mut self, query: &ListQuery) -> Result<Vec<E>, AppError> {
        let order = Self::set_sort(query.sort.as_ref())?;
        let filters = resolve_filters(E::descriptor(), &query.filters)?;

        let mut qb = self.select();
        push_filters(&mut qb, filters);

        qb.push(" ORDER BY ");
        let order_sql: Vec<String> = order.iter().map(OrderTerm::to_sql).collect();
        qb.push(order_sql.join(", "));

        if query.window.is_paginated() {
            qb.push(" LIMIT ")
                .push_bind(i64::from(query.window.limit))
                .push(" OFFSET ")
                .push_bind(i64::try_from(query.window.offset()).unwrap_or(i64::MAX));
        }

        let rows = qb.build_query_as::<E>().fetch_all(&mut *self.conn).await?;
        Ok(rows)
    }

    /// Counts the filtered rows, ignoring the page window.
    ///
    /// The sort is validated exactly as in [`all`](Self::all) but never
    /// reaches SQL.
    pub async fn count(&mut self, query: &ListQuery) -> Result<i64, AppError> {
        Self::set_sort(query.sort.as_ref())?;
        let filters = resolve_filters(E::descriptor(), &query.filters)?;

        let descriptor = E::descriptor();
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE 1 = 1", descriptor.table));
        self.push_live(&mut qb);
        push_filters(&mut qb, filters);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Applies a partial update and bumps `modified_date`.
    ///
    /// # Errors
    ///
    /// Same validation as [`create`](Self::create), plus
    /// [`AppError::NotFound`] if no visible row has this id.
    pub async fn update(&mut self, id: Uuid, fields: &Fields) -> Result<E, AppError> {
        let assignments = populate::<E>(fields, WriteMode::Update)?;
        self.check_relations(&assignments).await?;

        let descriptor = E::descriptor();
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE ");
        qb.push(descriptor.table).push(" SET modified_date = ");
        qb.push_bind(Utc::now());
        for a in assignments {
            qb.push(", ").push(a.column).push(" = ");
            push_value(&mut qb, a.value);
        }
        qb.push(" WHERE id = ").push_bind(id);
        self.push_live(&mut qb);
        qb.push(" RETURNING *");

        let record = qb
            .build_query_as::<E>()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(AppError::NotFound(None))?;

        tracing::debug!(table = descriptor.table, %id, "Record updated");
        Ok(record)
    }

    /// Deletes a row: sets the soft-delete marker when the entity has one,
    /// removes the row otherwise.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] if no live row has this id.
    pub async fn delete(&mut self, id: Uuid) -> Result<(), AppError> {
        let descriptor = E::descriptor();
        let mut qb: QueryBuilder<'_, Sqlite>;

        match descriptor.soft_delete {
            Some(marker) => {
                let now = Utc::now();
                qb = QueryBuilder::new("UPDATE ");
                qb.push(descriptor.table)
                    .push(" SET ")
                    .push(marker)
                    .push(" = ")
                    .push_bind(now)
                    .push(", modified_date = ")
                    .push_bind(now)
                    .push(" WHERE id = ")
                    .push_bind(id)
                    .push(" AND ")
                    .push(marker)
                    .push(" IS NULL");
            }
            None => {
                qb = QueryBuilder::new("DELETE FROM ");
                qb.push(descriptor.table).push(" WHERE id = ").push_bind(id);
            }
        }

        let result = qb.build().execute(&mut *self.conn).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(None));
        }

        tracing::debug!(
            table = descriptor.table,
            %id,
            soft = descriptor.soft_delete.is_some(),
            "Record deleted"
        );
        Ok(())
    }

    /// Clears the soft-delete marker of a row.
    ///
    /// # Errors
    ///
    /// - [`AppError::Internal`] unless the store was opened with
    ///   [`including_deleted`](Self::including_deleted)
    /// - [`AppError::BadRequest`] if the entity does not soft-delete
    /// - [`AppError::NotFound`] if the row does not exist
    pub async fn restore(&mut self, id: Uuid) -> Result<E, AppError> {
        if self.visibility != Visibility::IncludingDeleted {
            return Err(AppError::internal(
                "restore requires a store opened with including_deleted()",
            ));
        }

        let descriptor = E::descriptor();
        let Some(marker) = descriptor.soft_delete else {
            return Err(AppError::bad_request(format!(
                "{} records can't be restored",
                descriptor.table
            )));
        };

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE ");
        qb.push(descriptor.table)
            .push(" SET ")
            .push(marker)
            .push(" = NULL, modified_date = ")
            .push_bind(Utc::now())
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        let record = qb
            .build_query_as::<E>()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(AppError::NotFound(None))?;

        tracing::info!(table = descriptor.table, %id, "Record restored");
        Ok(record)
    }

    /// Verifies that every relation assignment points at a live row.
    async fn check_relations(&mut self, assignments: &[Assignment]) -> Result<(), AppError> {
        for a in assignments {
            let Some(relation) = a.relation else {
                continue;
            };
            if a.value.is_null() {
                continue;
            }

            let mut qb: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE id = ", relation.target));
            push_value(&mut qb, a.value.clone());
            if let Some(marker) = relation.target_soft_delete {
                qb.push(" AND ").push(marker).push(" IS NULL");
            }

            let found = qb
                .build_query_scalar::<i64>()
                .fetch_one(&mut *self.conn)
                .await?;
            if found == 0 {
                return Err(AppError::bad_request(format!(
                    "Related {} doesn't exist",
                    relation.name
                )));
            }
        }
        Ok(())
    }
}
