//! Field introspection
//!
//! A type describes its fields either with a structured JSON Schema
//! (usually generated by `schemars`) or with an explicit constructor
//! signature. Both descriptions are reduced to the same required/optional
//! split of [`FieldMetadata`] by a [`TypeIntrospector`].

use schemars::JsonSchema;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::document::is_truthy;
use crate::core::error::{Result, SchemaError};
use crate::core::origin::Owner;
use crate::model::field_info::FieldMetadata;

const UNKNOWN: &str = "Unknown";
const JSON_NULL: &str = "null";

/// Fields of one type, split by whether they carry a default
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldGroups {
    pub required: BTreeMap<String, FieldMetadata>,
    pub optional: BTreeMap<String, FieldMetadata>,
}

/// Which fields introspection keeps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldFilter {
    excluded: BTreeSet<String>,
    include_private: bool,
}

impl FieldFilter {
    pub fn new(excluded: BTreeSet<String>, include_private: bool) -> Self {
        Self {
            excluded,
            include_private,
        }
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn include_private(&self) -> bool {
        self.include_private
    }

    pub fn admits(&self, name: &str) -> bool {
        if !self.include_private && name.starts_with('_') {
            return false;
        }
        !self.excluded.contains(name)
    }
}

/// Reduces a type description to required/optional field metadata
pub trait TypeIntrospector {
    fn introspect(&self, owner: &Owner, filter: &FieldFilter) -> Result<FieldGroups>;
}

/// How a type declares its fields
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescription {
    /// A structured JSON Schema object with `properties` and `required`
    Model(Value),
    /// An explicit constructor signature
    Signature(Vec<Param>),
    /// A description that could not be produced, with the reason
    Unavailable(String),
}

impl TypeDescription {
    /// Structured description generated from a `JsonSchema` derive
    pub fn json_schema<T: JsonSchema>() -> Self {
        let schema = schemars::schema_for!(T);
        match serde_json::to_value(schema) {
            Ok(value) => TypeDescription::Model(value),
            Err(e) => TypeDescription::Unavailable(format!("cannot serialize JSON schema: {}", e)),
        }
    }

    pub fn signature(params: impl IntoIterator<Item = Param>) -> Self {
        TypeDescription::Signature(params.into_iter().collect())
    }

    /// Pick the introspection strategy matching this description
    pub fn introspect(&self, owner: &Owner, filter: &FieldFilter) -> Result<FieldGroups> {
        match self {
            TypeDescription::Model(schema) => JsonSchemaIntrospector::new(schema).introspect(owner, filter),
            TypeDescription::Signature(params) => {
                SignatureIntrospector::new(params).introspect(owner, filter)
            }
            TypeDescription::Unavailable(reason) => Err(SchemaError::Introspection {
                class_name: owner.name().to_string(),
                message: reason.clone(),
            }),
        }
    }
}

/// Introspection over a JSON Schema object
pub struct JsonSchemaIntrospector<'a> {
    schema: &'a Value,
}

impl<'a> JsonSchemaIntrospector<'a> {
    pub fn new(schema: &'a Value) -> Self {
        Self { schema }
    }
}

impl TypeIntrospector for JsonSchemaIntrospector<'_> {
    fn introspect(&self, owner: &Owner, filter: &FieldFilter) -> Result<FieldGroups> {
        let properties = self
            .schema
            .get("properties")
            .and_then(|p| p.as_object())
            .ok_or_else(|| SchemaError::Introspection {
                class_name: owner.name().to_string(),
                message: "no field declarations found; lazily declared types are not supported"
                    .to_string(),
            })?;
        let required: BTreeSet<&str> = self
            .schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let mut groups = FieldGroups::default();
        for (name, property) in properties {
            if !filter.admits(name) {
                continue;
            }

            let mut metadata = FieldMetadata::new(json_type_label(property));
            // Falsy defaults (null, false, 0, "", [], {}) are not recorded
            if let Some(default) = property.get("default").filter(|d| is_truthy(d)) {
                metadata = metadata.with_default(owner.clone(), default.clone());
            }

            if required.contains(name.as_str()) {
                groups.required.insert(name.clone(), metadata);
            } else {
                groups.optional.insert(name.clone(), metadata);
            }
        }

        Ok(groups)
    }
}

fn json_type_label(property: &Value) -> String {
    if let Some(kind) = property.get("type") {
        return match kind {
            Value::String(s) => s.clone(),
            Value::Array(alternatives) => {
                union_label(alternatives.iter().filter_map(|v| v.as_str()).map(String::from))
            }
            _ => UNKNOWN.to_string(),
        };
    }
    if let Some(any_of) = property.get("anyOf").and_then(|a| a.as_array()) {
        return union_label(any_of.iter().map(json_type_label));
    }
    if let Some(all_of) = property.get("allOf").and_then(|a| a.as_array()) {
        let labels = all_of.iter().map(json_type_label).collect::<Vec<_>>();
        return format!("All[{}]", labels.join(", "));
    }
    if let Some(reference) = property.get("$ref").and_then(|r| r.as_str()) {
        return reference.rsplit('/').next().unwrap_or(reference).to_string();
    }
    UNKNOWN.to_string()
}

fn union_label(alternatives: impl Iterator<Item = String>) -> String {
    let mut labels: Vec<String> = alternatives.filter(|label| label != JSON_NULL).collect();
    match labels.len() {
        0 => JSON_NULL.to_string(),
        1 => labels.remove(0),
        _ => format!("Any[{}]", labels.join(", ")),
    }
}

/// Type hint of a constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Named(String),
    NoneType,
    Union(Vec<TypeHint>),
    Unknown,
}

impl TypeHint {
    pub fn named(name: impl Into<String>) -> Self {
        TypeHint::Named(name.into())
    }

    pub fn union(alternatives: impl IntoIterator<Item = TypeHint>) -> Self {
        TypeHint::Union(alternatives.into_iter().collect())
    }

    /// Hint derived from the Rust type name, module paths stripped
    ///
    /// `Option<X>` becomes the union of `X` and `None`.
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_name(&strip_module_paths(std::any::type_name::<T>()))
    }

    fn from_type_name(name: &str) -> Self {
        if let Some(inner) = name.strip_prefix("Option<").and_then(|s| s.strip_suffix('>')) {
            return TypeHint::Union(vec![Self::from_type_name(inner), TypeHint::NoneType]);
        }
        if name == "()" {
            return TypeHint::NoneType;
        }
        TypeHint::Named(name.to_string())
    }

    pub fn label(&self) -> String {
        match self {
            TypeHint::Named(name) => name.clone(),
            TypeHint::NoneType => "None".to_string(),
            TypeHint::Unknown => UNKNOWN.to_string(),
            TypeHint::Union(alternatives) => {
                let mut labels: Vec<String> = alternatives
                    .iter()
                    .filter(|alt| !matches!(alt, TypeHint::NoneType))
                    .map(TypeHint::label)
                    .collect();
                match labels.len() {
                    0 => TypeHint::NoneType.label(),
                    1 => labels.remove(0),
                    _ => format!("Any[{}]", labels.join(", ")),
                }
            }
        }
    }
}

fn strip_module_paths(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            segment.push(ch);
        } else if ch == ':' {
            segment.clear();
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(&segment);
    out
}

/// One constructor parameter
///
/// `default: None` makes the parameter required. A `null` default makes it
/// optional without recording a default for the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    type_hint: TypeHint,
    default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, type_hint: TypeHint, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            type_hint,
            default,
        }
    }

    pub fn required<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, TypeHint::of::<T>(), None)
    }

    pub fn optional<T: ?Sized>(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self::new(name, TypeHint::of::<T>(), Some(default.into()))
    }

    /// Optional parameter whose default is `None`
    pub fn defaults_to_none<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, TypeHint::of::<T>(), Some(Value::Null))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_hint(&self) -> &TypeHint {
        &self.type_hint
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Introspection over a declared constructor signature
pub struct SignatureIntrospector<'a> {
    params: &'a [Param],
}

impl<'a> SignatureIntrospector<'a> {
    pub fn new(params: &'a [Param]) -> Self {
        Self { params }
    }
}

impl TypeIntrospector for SignatureIntrospector<'_> {
    fn introspect(&self, owner: &Owner, filter: &FieldFilter) -> Result<FieldGroups> {
        let mut groups = FieldGroups::default();
        for param in self.params {
            if !filter.admits(&param.name) {
                continue;
            }

            let metadata = FieldMetadata::new(param.type_hint.label());
            match &param.default {
                None => {
                    groups.required.insert(param.name.clone(), metadata);
                }
                // Only a `None` default goes unrecorded here, unlike JSON Schema models
                Some(Value::Null) => {
                    groups.optional.insert(param.name.clone(), metadata);
                }
                Some(default) => {
                    groups.optional.insert(
                        param.name.clone(),
                        metadata.with_default(owner.clone(), default.clone()),
                    );
                }
            }
        }
        Ok(groups)
    }
}
