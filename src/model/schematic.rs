//! Validated required/optional field maps of one origin

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::document::{
    names_value, Document, CLASS_NAME_KEY, DEFINED_KEY, FIELD_INFO_KEY, OPTIONAL_KEY, REQUIRED_KEY,
};
use crate::core::error::{Result, SchemaError};
use crate::core::origin::Origin;
use crate::model::field_info::{render_field_to_info, FieldMetadata};

/// The required and optional fields of one origin
///
/// At least one group is non-empty and the two are disjoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Schematic {
    class_name: String,
    required: BTreeMap<String, FieldMetadata>,
    optional: BTreeMap<String, FieldMetadata>,
    field_to_info: BTreeMap<String, FieldMetadata>,
}

impl Schematic {
    pub fn new(
        class_name: impl Into<String>,
        required: BTreeMap<String, FieldMetadata>,
        optional: BTreeMap<String, FieldMetadata>,
    ) -> Result<Self> {
        let class_name = class_name.into();

        if required.is_empty() && optional.is_empty() {
            return Err(SchemaError::Construction {
                class_name,
                message: "either required or optional fields must exist in the origin".to_string(),
            });
        }

        let overlap: Vec<&String> = required.keys().filter(|k| optional.contains_key(*k)).collect();
        if !overlap.is_empty() {
            return Err(SchemaError::Construction {
                message: format!(
                    "fields cannot be both required and optional simultaneously: {:?}",
                    overlap
                ),
                class_name,
            });
        }

        let mut field_to_info = required.clone();
        field_to_info.extend(optional.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(Self {
            class_name,
            required,
            optional,
            field_to_info,
        })
    }

    /// Introspect an origin and validate the result
    pub fn from_origin(origin: &Origin) -> Result<Self> {
        let groups = origin.introspect()?;
        let schematic = Self::new(origin.class_name(), groups.required, groups.optional)?;
        debug!(
            class_name = %schematic.class_name,
            required = schematic.required.len(),
            optional = schematic.optional.len(),
            "materialised schematic"
        );
        Ok(schematic)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn required(&self) -> &BTreeMap<String, FieldMetadata> {
        &self.required
    }

    pub fn optional(&self) -> &BTreeMap<String, FieldMetadata> {
        &self.optional
    }

    /// Union of the required and optional maps
    pub fn field_to_info(&self) -> &BTreeMap<String, FieldMetadata> {
        &self.field_to_info
    }

    /// `{class_name?, defined?, required?: {name: info}, optional?: {name: info}}`
    pub fn schema_dict(&self, with_class_name: bool, with_defined: bool) -> Document {
        let mut result = Document::new();

        if with_class_name {
            result.insert(CLASS_NAME_KEY.to_string(), Value::String(self.class_name.clone()));
        }
        if with_defined {
            result.insert(DEFINED_KEY.to_string(), Value::Object(Document::new()));
        }
        if !self.required.is_empty() {
            result.insert(REQUIRED_KEY.to_string(), Value::Object(render_field_to_info(&self.required)));
        }
        if !self.optional.is_empty() {
            result.insert(OPTIONAL_KEY.to_string(), Value::Object(render_field_to_info(&self.optional)));
        }

        result
    }

    /// Like [`Self::schema_dict`], with name lists and a separate `field_to_info`
    pub fn schema_dict_field_info_extracted(&self, with_class_name: bool, with_defined: bool) -> Document {
        let mut result = self.schema_dict(with_class_name, with_defined);
        let mut field_to_info = Document::new();

        for key in [REQUIRED_KEY, OPTIONAL_KEY] {
            if let Some(Value::Object(rendered)) = result.get(key).cloned() {
                let names = names_value(rendered.keys());
                field_to_info.extend(rendered);
                result.insert(key.to_string(), names);
            }
        }

        result.insert(FIELD_INFO_KEY.to_string(), Value::Object(field_to_info));
        result
    }
}
