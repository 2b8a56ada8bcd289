//! Infrastructure layer: everything that talks to the database.

pub mod persistence;
