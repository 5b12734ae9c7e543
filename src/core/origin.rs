//! Origins - the user-defined types a schema describes
//!
//! Rust has no runtime class objects, so each schema holds an [`Origin`]:
//! a type-erased handle carrying the type's stable name, its field
//! description and a constructor. Owners of field defaults are keyed by
//! [`Owner`], a string key, instead of by type identity.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::document::Kwargs;
use crate::core::error::{Result, SchemaError};
use crate::model::introspect::{FieldFilter, FieldGroups, TypeDescription};

/// Capability hook for types that keep some fields out of their schema
pub trait ExcludableFields {
    /// Keep fields whose names start with an underscore
    const INCLUDE_PRIVATE: bool = false;

    /// Field names that never appear in the generated schema
    fn excluded_field_names() -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// A type that can be described by, and constructed from, a schema document
pub trait Schemantic: DeserializeOwned + ExcludableFields + 'static {
    /// Name used in documents and as the default mapping name
    fn class_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Field declarations of this type
    fn describe() -> TypeDescription;

    /// Build an instance from constructor arguments
    fn construct(kwargs: Kwargs) -> Result<Self> {
        serde_json::from_value(Value::Object(kwargs)).map_err(|e| SchemaError::Instantiation {
            class_name: Self::class_name().to_string(),
            source: Box::new(e),
        })
    }
}

/// Strip module path and generic arguments from a type name
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Stable key for the type owning a field default
///
/// Ordered by short name first so renderings sort by class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Owner {
    name: String,
    path: String,
}

impl Owner {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn of<T: Schemantic>() -> Self {
        Self::new(T::class_name(), std::any::type_name::<T>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified type path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Type-erased handle to a [`Schemantic`] type
#[derive(Clone)]
pub struct Origin {
    owner: Owner,
    type_id: TypeId,
    include_private: bool,
    excluded: fn() -> BTreeSet<String>,
    describe: fn() -> TypeDescription,
    construct: fn(Kwargs) -> Result<Box<dyn Any>>,
}

impl Origin {
    pub fn of<T: Schemantic>() -> Self {
        Self {
            owner: Owner::of::<T>(),
            type_id: TypeId::of::<T>(),
            include_private: T::INCLUDE_PRIVATE,
            excluded: T::excluded_field_names,
            describe: T::describe,
            construct: construct_boxed::<T>,
        }
    }

    pub fn class_name(&self) -> &str {
        self.owner.name()
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Exclusion set and private-field policy of this origin
    pub fn field_filter(&self) -> FieldFilter {
        FieldFilter::new((self.excluded)(), self.include_private)
    }

    pub fn describe(&self) -> TypeDescription {
        (self.describe)()
    }

    /// Split this origin's fields into required and optional groups
    pub fn introspect(&self) -> Result<FieldGroups> {
        self.describe().introspect(&self.owner, &self.field_filter())
    }

    pub fn construct(&self, kwargs: Kwargs) -> Result<AnyInstance> {
        let value = (self.construct)(kwargs)?;
        Ok(AnyInstance {
            class_name: self.class_name().to_string(),
            value,
        })
    }
}

fn construct_boxed<T: Schemantic>(kwargs: Kwargs) -> Result<Box<dyn Any>> {
    Ok(Box::new(T::construct(kwargs)?))
}

impl PartialEq for Origin {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Origin {}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("owner", &self.owner)
            .field("include_private", &self.include_private)
            .finish_non_exhaustive()
    }
}

/// An instance of some origin whose type is only known at runtime
pub struct AnyInstance {
    class_name: String,
    value: Box<dyn Any>,
}

impl AnyInstance {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Recover the concrete instance, or get `self` back on a type mismatch
    pub fn downcast<T: 'static>(self) -> std::result::Result<T, Self> {
        let class_name = self.class_name;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { class_name, value }),
        }
    }
}

impl fmt::Debug for AnyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyInstance")
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

/// Output type of `parse_schema_to_instance`
pub trait Instance: Sized + 'static {
    fn instantiate(origin: &Origin, kwargs: Kwargs) -> Result<Self>;
}

impl<T: Schemantic> Instance for T {
    fn instantiate(_origin: &Origin, kwargs: Kwargs) -> Result<Self> {
        T::construct(kwargs)
    }
}

impl Instance for AnyInstance {
    fn instantiate(origin: &Origin, kwargs: Kwargs) -> Result<Self> {
        origin.construct(kwargs)
    }
}

/// Maps labels (mapping names) back to origins
#[derive(Debug, Clone, Default)]
pub struct OriginRegistry {
    by_label: BTreeMap<String, Origin>,
}

impl OriginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an origin under a label; labels are unique
    pub fn register(&mut self, label: impl Into<String>, origin: Origin) -> Result<()> {
        let label = label.into();
        if self.by_label.contains_key(&label) {
            return Err(SchemaError::Construction {
                class_name: origin.class_name().to_string(),
                message: format!("the label '{}' is already registered", label),
            });
        }
        self.by_label.insert(label, origin);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&Origin> {
        self.by_label.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_label.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    pub fn construct(&self, label: &str, kwargs: Kwargs) -> Result<AnyInstance> {
        let origin = self
            .get(label)
            .ok_or_else(|| SchemaError::parse(format!("no origin registered as '{}'", label)))?;
        origin.construct(kwargs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::introspect::Param;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pump {
        rate: i64,
    }

    impl ExcludableFields for Pump {
        fn excluded_field_names() -> BTreeSet<String> {
            BTreeSet::from(["serial".to_string()])
        }
    }

    impl Schemantic for Pump {
        fn describe() -> TypeDescription {
            TypeDescription::signature([Param::required::<i64>("rate")])
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Pump"), "Pump");
        assert_eq!(short_type_name("a::Wrapper<b::Pump>"), "Wrapper");
        assert_eq!(short_type_name("Pump"), "Pump");
    }

    #[test]
    fn test_origin_identity() {
        let origin = Origin::of::<Pump>();
        assert_eq!(origin.class_name(), "Pump");
        assert!(origin.owner().path().ends_with("Pump"));
        assert!(origin.is::<Pump>());
        assert_eq!(origin, Origin::of::<Pump>());
        assert!(origin.field_filter().excluded().contains("serial"));
    }

    #[test]
    fn test_origin_construct_and_downcast() {
        let origin = Origin::of::<Pump>();
        let kwargs = json!({"rate": 3}).as_object().cloned().unwrap();
        let instance = origin.construct(kwargs).unwrap();
        assert_eq!(instance.class_name(), "Pump");
        assert_eq!(instance.downcast_ref::<Pump>(), Some(&Pump { rate: 3 }));
        let err = instance.downcast::<String>().unwrap_err();
        assert_eq!(err.downcast::<Pump>().unwrap(), Pump { rate: 3 });
    }

    #[test]
    fn test_construct_error_keeps_source() {
        let origin = Origin::of::<Pump>();
        let kwargs = json!({"rate": "fast"}).as_object().cloned().unwrap();
        let err = origin.construct(kwargs).unwrap_err();
        match err {
            SchemaError::Instantiation { class_name, source } => {
                assert_eq!(class_name, "Pump");
                assert!(source.downcast_ref::<serde_json::Error>().is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registry_rejects_duplicate_label() {
        let mut registry = OriginRegistry::new();
        registry.register("pump", Origin::of::<Pump>()).unwrap();
        assert!(registry.register("pump", Origin::of::<Pump>()).is_err());
        assert_eq!(registry.len(), 1);
        assert!(registry.construct("valve", Kwargs::new()).is_err());
    }
}
