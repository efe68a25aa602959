//! SQLite-backed storage: staged papers and vector collections.

pub mod collection;
pub mod db;
pub mod migrations;

pub use collection::{CollectionSchema, DataObject, DataType, Hit, NearVector, Property};
pub use db::Database;
