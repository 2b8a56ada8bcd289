//! SQLite persistence.
//!
//! - [`RecordStore`] - generic CRUD, sort, filter and pagination over entities
//! - [`ListQuery`] / [`Predicate`] - what to list
//! - [`pool`] - pool construction and migrations

pub mod pool;
pub mod query;
pub mod record_store;

pub use query::{ListQuery, Predicate};
pub use record_store::{RecordStore, Visibility};
