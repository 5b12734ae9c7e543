//! Field model - metadata, introspection and per-origin schematics

pub mod field_info;
pub mod introspect;
pub mod schematic;

pub use field_info::FieldMetadata;
pub use introspect::{
    FieldFilter, FieldGroups, JsonSchemaIntrospector, Param, SignatureIntrospector, TypeDescription,
    TypeHint, TypeIntrospector,
};
pub use schematic::Schematic;
