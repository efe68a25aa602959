//! Core data model for paperseek.
//!
//! This crate defines the `Paper` record, the vector distance metrics, and
//! the SQLite-backed store that holds staged papers and the vector
//! collections queried by nearest-neighbour search.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;
pub mod vector;

pub use error::{Error, Result};
