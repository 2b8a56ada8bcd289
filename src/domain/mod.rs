//! Domain layer: entity descriptors, sort specifications, page windows and
//! the caller identity.
//!
//! Nothing here touches the database or HTTP. The record store and the
//! dispatcher consume these types.

pub mod entities;
pub mod entity;
pub mod identity;
pub mod page;
pub mod sort;

pub use entity::{Entity, EntityDescriptor, FieldValue, Fields};
pub use identity::Identity;
pub use page::PageWindow;
pub use sort::{SortItem, SortSpec};
