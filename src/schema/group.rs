//! Schema of a group of different types
//!
//! Fields shared by several members are merged into one description whose
//! defaults list every member that declares one. A member's values override
//! the `common` section's values.

use serde_json::Value;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

use crate::core::document::{
    as_document, names_value, overlay, sub_document, Document, Kwargs, CLASS_NAME_KEY, COMMON_KEY,
    DEFINED_KEY, FIELD_INFO_KEY, OPTIONAL_KEY, REQUIRED_KEY,
};
use crate::core::error::{Result, SchemaError};
use crate::core::origin::{AnyInstance, Origin, OriginRegistry};
use crate::model::field_info::{render_field_to_info, FieldMetadata};
use crate::model::schematic::Schematic;
use crate::schema::options::GroupOptions;
use crate::schema::single::SingleSchema;
use crate::schema::{configuration_from_mapping, keys_to_not_parse, BaseSchema, DefinedSchema};

/// Names no member may be called
pub const GROUP_RESERVED_NAMES: [&str; 2] = [COMMON_KEY, FIELD_INFO_KEY];

/// A group document whose `field_to_info` is still unrendered
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadataSchema {
    /// Everything except `field_to_info`
    pub document: Document,
    /// Merged metadata of every member field, sorted by name
    pub field_to_info: BTreeMap<String, FieldMetadata>,
}

/// Schema of several heterogeneous origins under one mapping name
pub struct GroupSchema {
    mapping_name: String,
    members: Vec<SingleSchema>,
    pre_definitions: Option<Document>,
    member_label_to_origin: OriginRegistry,
    common_field_to_info: OnceCell<BTreeMap<String, FieldMetadata>>,
}

impl GroupSchema {
    pub fn new(mapping_name: impl Into<String>, members: impl IntoIterator<Item = SingleSchema>) -> Result<Self> {
        let mapping_name = mapping_name.into();

        let mut unique: Vec<SingleSchema> = Vec::new();
        for member in members {
            if unique.contains(&member) {
                warn!(
                    group = %mapping_name,
                    origin = member.origin().class_name(),
                    "dropping repeated group member"
                );
                continue;
            }
            unique.push(member);
        }

        if unique.is_empty() {
            return Err(SchemaError::Construction {
                class_name: mapping_name,
                message: "a group needs at least one member".to_string(),
            });
        }

        let clashing: Vec<String> = unique
            .iter()
            .flat_map(|member| [member.origin().class_name(), member.mapping_name()])
            .filter(|name| GROUP_RESERVED_NAMES.contains(name))
            .map(String::from)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !clashing.is_empty() {
            return Err(SchemaError::ReservedName {
                names: clashing,
                reserved: GROUP_RESERVED_NAMES.iter().map(|name| name.to_string()).collect(),
            });
        }

        let mut member_label_to_origin = OriginRegistry::new();
        for member in &unique {
            member_label_to_origin.register(member.mapping_name(), member.origin().clone())?;
        }

        Ok(Self {
            mapping_name,
            members: unique,
            pre_definitions: None,
            member_label_to_origin,
            common_field_to_info: OnceCell::new(),
        })
    }

    pub fn from_origins(mapping_name: impl Into<String>, origins: impl IntoIterator<Item = Origin>) -> Result<Self> {
        Self::new(mapping_name, origins.into_iter().map(SingleSchema::from_origin))
    }

    /// Members keyed by alias instead of class name
    pub fn from_aliased_origins<S: Into<String>>(
        mapping_name: impl Into<String>,
        origins: impl IntoIterator<Item = (S, Origin)>,
    ) -> Result<Self> {
        Self::new(
            mapping_name,
            origins
                .into_iter()
                .map(|(alias, origin)| SingleSchema::from_origin(origin).with_alias(alias)),
        )
    }

    /// Pre-filled `defined` sections keyed by member name
    ///
    /// The common section's `defined` is read from the `common` key, not
    /// from a top-level `defined` key, so it cannot clash with a member.
    pub fn with_pre_definitions(mut self, pre_definitions: Document) -> Self {
        self.pre_definitions = Some(pre_definitions);
        self
    }

    pub fn mapping_name(&self) -> &str {
        &self.mapping_name
    }

    pub fn members(&self) -> &[SingleSchema] {
        &self.members
    }

    pub fn member_label_to_origin(&self) -> &OriginRegistry {
        &self.member_label_to_origin
    }

    /// Fields declared by more than one member, metadata merged across all of them
    ///
    /// Every member's fields are checked against every other member, so
    /// conflicting defaults are caught between any pair.
    pub fn common_field_to_info(&self) -> Result<&BTreeMap<String, FieldMetadata>> {
        if let Some(common) = self.common_field_to_info.get() {
            return Ok(common);
        }

        let schematics = self.schematics()?;
        let mut common: BTreeMap<String, FieldMetadata> = BTreeMap::new();
        for (index, schematic) in schematics.iter().enumerate() {
            for field in schematic.field_to_info().keys() {
                for (other_index, other) in schematics.iter().enumerate() {
                    if other_index == index {
                        continue;
                    }
                    if let Some(other_info) = other.field_to_info().get(field) {
                        match common.get_mut(field) {
                            Some(existing) => existing.merge_owner_to_default_with_other(other_info)?,
                            None => {
                                common.insert(field.clone(), other_info.clone());
                            }
                        }
                    }
                }
            }
        }

        debug!(group = %self.mapping_name, fields = common.len(), "merged common field metadata");
        Ok(self.common_field_to_info.get_or_init(|| common))
    }

    fn schematics(&self) -> Result<Vec<&Schematic>> {
        self.members.iter().map(SingleSchema::schematic).collect()
    }

    fn pre_defined(&self, key: &str) -> Value {
        self.pre_definitions
            .as_ref()
            .and_then(|pre| pre.get(key))
            .cloned()
            .unwrap_or_else(|| Value::Object(Document::new()))
    }

    /// Emit the group document, keeping `field_to_info` as metadata
    pub fn schema_with_field_metadata(&self, options: &GroupOptions) -> Result<FieldMetadataSchema> {
        let mut members = Document::new();
        let mut field_to_info: BTreeMap<String, FieldMetadata> = BTreeMap::new();
        let mut required: BTreeSet<String> = BTreeSet::new();
        let mut optional: BTreeSet<String> = BTreeSet::new();

        for member in &self.members {
            let name = member.mapping_name();
            let schematic = member.schematic()?;

            let mut section = Document::new();
            section.insert(
                CLASS_NAME_KEY.to_string(),
                Value::String(member.origin().class_name().to_string()),
            );
            if options.with_defined {
                section.insert(DEFINED_KEY.to_string(), self.pre_defined(name));
            }
            if options.with_required && !schematic.required().is_empty() {
                section.insert(REQUIRED_KEY.to_string(), names_value(schematic.required().keys()));
                required.extend(schematic.required().keys().cloned());
            }
            if options.with_optional && !schematic.optional().is_empty() {
                section.insert(OPTIONAL_KEY.to_string(), names_value(schematic.optional().keys()));
                optional.extend(schematic.optional().keys().cloned());
            }

            members.insert(name.to_string(), Value::Object(section));
            field_to_info.extend(
                schematic
                    .field_to_info()
                    .iter()
                    .map(|(field, info)| (field.clone(), info.clone())),
            );
        }

        let common_field_to_info = self.common_field_to_info()?;

        let mut document = Document::new();
        if options.with_common && !common_field_to_info.is_empty() {
            let mut common = Document::new();
            if options.with_defined {
                common.insert(DEFINED_KEY.to_string(), self.pre_defined(COMMON_KEY));
            }
            if !required.is_empty() {
                common.insert(REQUIRED_KEY.to_string(), names_value(&required));
            }
            if !optional.is_empty() {
                common.insert(OPTIONAL_KEY.to_string(), names_value(&optional));
            }
            document.insert(COMMON_KEY.to_string(), Value::Object(common));
        }
        document.extend(members);

        field_to_info.extend(
            common_field_to_info
                .iter()
                .map(|(field, info)| (field.clone(), info.clone())),
        );

        Ok(FieldMetadataSchema {
            document,
            field_to_info,
        })
    }

    pub fn schema(&self) -> Result<Document> {
        self.schema_with(&GroupOptions::default())
    }

    /// Emit `{common?, <member>: {class_name, defined?, required?, optional?}.., field_to_info}`
    pub fn schema_with(&self, options: &GroupOptions) -> Result<Document> {
        let FieldMetadataSchema {
            mut document,
            field_to_info,
        } = self.schema_with_field_metadata(options)?;
        document.insert(
            FIELD_INFO_KEY.to_string(),
            Value::Object(render_field_to_info(&field_to_info)),
        );
        Ok(document)
    }

    /// Constructor arguments for every member
    ///
    /// Each member gets `inferior_config_kwargs`, overridden by
    /// `common.defined`, overridden by its own `defined` section.
    pub fn parse_schema<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        inferior_config_kwargs: Option<&Kwargs>,
    ) -> Result<BTreeMap<String, Kwargs>> {
        let document = defined_schema.into().resolve()?;
        let config = configuration_from_mapping(&document, &self.mapping_name, false)?;

        let common_defined = match config.get(COMMON_KEY) {
            Some(value) => as_document(value, COMMON_KEY)?.get(DEFINED_KEY),
            None => None,
        };
        let common_defined = match common_defined {
            Some(value) => Some(as_document(value, DEFINED_KEY)?),
            None => None,
        };

        let reserved = keys_to_not_parse(&GROUP_RESERVED_NAMES);
        let mut result = BTreeMap::new();
        for member in &self.members {
            let name = member.mapping_name();
            if reserved.contains(name) {
                continue;
            }
            let section = sub_document(config, name)?;
            let defined = sub_document(section, DEFINED_KEY)?;

            let mut kwargs = inferior_config_kwargs.cloned().unwrap_or_default();
            if let Some(common) = common_defined {
                overlay(&mut kwargs, common);
            }
            overlay(&mut kwargs, defined);
            result.insert(name.to_string(), kwargs);
        }

        Ok(result)
    }

    /// Build every member, keyed by member name
    pub fn parse_schema_to_instance<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        inferior_config_kwargs: Option<&Kwargs>,
    ) -> Result<BTreeMap<String, AnyInstance>> {
        self.parse_schema(defined_schema, inferior_config_kwargs)?
            .into_iter()
            .map(|(name, kwargs)| {
                let instance = self.member_label_to_origin.construct(&name, kwargs)?;
                Ok((name, instance))
            })
            .collect()
    }
}

impl BaseSchema for GroupSchema {
    type Options = GroupOptions;

    fn schema_with(&self, options: &GroupOptions) -> Result<Document> {
        GroupSchema::schema_with(self, options)
    }
}

impl Clone for GroupSchema {
    fn clone(&self) -> Self {
        Self {
            mapping_name: self.mapping_name.clone(),
            members: self.members.clone(),
            pre_definitions: self.pre_definitions.clone(),
            member_label_to_origin: self.member_label_to_origin.clone(),
            common_field_to_info: self.common_field_to_info.clone(),
        }
    }
}

/// Groups are equal when they hold the same origins, in any order
impl PartialEq for GroupSchema {
    fn eq(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self.members.iter().all(|member| other.members.contains(member))
    }
}

impl fmt::Debug for GroupSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSchema")
            .field("mapping_name", &self.mapping_name)
            .field("members", &self.members)
            .field("pre_definitions", &self.pre_definitions)
            .finish_non_exhaustive()
    }
}
