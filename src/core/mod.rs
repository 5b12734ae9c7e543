//! Core module - fundamental types and utilities

pub mod config;
pub mod document;
pub mod error;
pub mod origin;

pub use config::Config;
pub use document::{Document, Kwargs};
pub use error::{DefaultDisagreement, Result, SchemaError};
pub use origin::{AnyInstance, ExcludableFields, Instance, Origin, OriginRegistry, Owner, Schemantic};
