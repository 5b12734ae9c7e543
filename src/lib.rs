//! Schemantic: derive editable configuration templates from Rust types
//!
//! A schema describes the required and optional fields of one or more
//! types. Schemas are emitted as TOML or YAML documents, edited by hand,
//! and parsed back into constructor arguments or instances.
//!
//! - [`SingleSchema`]: one type
//! - [`HomologueSchema`]: several named instances of one type sharing a `common` base
//! - [`GroupSchema`]: several different types, with the fields they share merged
//! - [`CultureSchema`]: a collection of the above under one document

pub mod codec;
pub mod core;
pub mod model;
pub mod schema;

pub use crate::core::{
    AnyInstance, Config, Document, ExcludableFields, Kwargs, Origin, OriginRegistry, Owner, Result,
    SchemaError, Schemantic,
};
pub use crate::model::{FieldMetadata, Param, Schematic, TypeDescription, TypeHint};
pub use crate::schema::{
    BaseSchema, CultureOptions, CultureSchema, DefinedSchema, GroupOptions, GroupSchema,
    HomologueOptions, HomologueSchema, SingleOptions, SingleSchema, SourceSchema,
};
