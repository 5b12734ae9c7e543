//! Schema of several named instances of one type
//!
//! Every instance shares the `common` section of the document and
//! overrides it with its own section:
//!
//! ```yaml
//! class_name: Engine
//! common: {power: 3}
//! left: {}
//! right: {power: 4}
//! required: [power]
//! optional: [label]
//! field_to_info: {label: str, power: int}
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::document::{
    as_document, overlay, Document, Kwargs, CLASS_NAME_KEY, COMMON_KEY, DEFINED_KEY, FIELD_INFO_KEY,
};
use crate::core::error::{Result, SchemaError};
use crate::core::origin::{AnyInstance, Instance, Origin, Schemantic};
use crate::schema::options::HomologueOptions;
use crate::schema::single::SingleSchema;
use crate::schema::{configuration_from_mapping, keys_to_not_parse, BaseSchema, DefinedSchema};

/// Names that can never be instance names
pub const HOMOLOGUE_RESERVED_NAMES: [&str; 4] = [CLASS_NAME_KEY, COMMON_KEY, DEFINED_KEY, FIELD_INFO_KEY];

/// Produces instance names from caller-supplied arguments when a schema is emitted
pub type NameGetter = Arc<dyn Fn(&Kwargs) -> Vec<String> + Send + Sync>;

/// Schema of like-configured instances of one origin, told apart by name
pub struct HomologueSchema<T = AnyInstance> {
    single_schema: SingleSchema<T>,
    instance_names: Vec<String>,
    name_getter: Option<NameGetter>,
    schema_alias: Option<String>,
    pre_definitions: Option<Document>,
}

impl<T> HomologueSchema<T> {
    /// Needs instance names or a name getter; two names at least without a getter
    pub fn new(
        single_schema: SingleSchema<T>,
        instance_names: Vec<String>,
        name_getter: Option<NameGetter>,
    ) -> Result<Self> {
        let instance_names = dedup(instance_names);
        let class_name = single_schema.origin().class_name().to_string();

        if instance_names.is_empty() && name_getter.is_none() {
            return Err(SchemaError::Configuration { class_name });
        }
        if name_getter.is_none() && instance_names.len() == 1 {
            return Err(SchemaError::Arity {
                class_name,
                count: instance_names.len(),
            });
        }

        Ok(Self {
            single_schema,
            instance_names,
            name_getter,
            schema_alias: None,
            pre_definitions: None,
        })
    }

    pub fn from_names<I>(single_schema: SingleSchema<T>, instance_names: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(
            single_schema,
            instance_names.into_iter().map(Into::into).collect(),
            None,
        )
    }

    pub fn from_name_getter<F>(single_schema: SingleSchema<T>, name_getter: F) -> Result<Self>
    where
        F: Fn(&Kwargs) -> Vec<String> + Send + Sync + 'static,
    {
        Self::new(single_schema, Vec::new(), Some(Arc::new(name_getter)))
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.schema_alias = Some(alias.into());
        self
    }

    /// Per-instance sections emitted in place of `{}`, keyed by instance name
    pub fn with_pre_definitions(mut self, pre_definitions: Document) -> Self {
        self.pre_definitions = Some(pre_definitions);
        self
    }

    pub fn single_schema(&self) -> &SingleSchema<T> {
        &self.single_schema
    }

    pub fn origin(&self) -> &Origin {
        self.single_schema.origin()
    }

    pub fn instance_names(&self) -> &[String] {
        &self.instance_names
    }

    pub fn has_name_getter(&self) -> bool {
        self.name_getter.is_some()
    }

    pub fn mapping_name(&self) -> &str {
        self.schema_alias
            .as_deref()
            .unwrap_or_else(|| self.single_schema.mapping_name())
    }

    /// Names of every instance: the getter's names (when it is given
    /// non-empty arguments) followed by the fixed instance names
    ///
    /// An instance may not share the schema's mapping name, since parsing
    /// would unwrap into that instance's section.
    pub fn homologue_names(&self, name_getter_kwargs: Option<&Kwargs>) -> Result<Vec<String>> {
        let names = match (&self.name_getter, name_getter_kwargs) {
            (Some(getter), Some(kwargs)) if !kwargs.is_empty() => {
                let mut names = getter(kwargs);
                names.extend(self.instance_names.iter().cloned());
                dedup(names)
            }
            _ => self.instance_names.clone(),
        };

        let reserved = keys_to_not_parse(&HOMOLOGUE_RESERVED_NAMES);
        let mapping_name = self.mapping_name();
        let clashing: Vec<String> = names
            .iter()
            .filter(|name| reserved.contains(name.as_str()) || name.as_str() == mapping_name)
            .cloned()
            .collect();
        if !clashing.is_empty() {
            let mut reserved: Vec<String> = reserved.iter().map(|key| key.to_string()).collect();
            reserved.push(mapping_name.to_string());
            return Err(SchemaError::ReservedName {
                names: clashing,
                reserved,
            });
        }

        Ok(names)
    }

    pub fn schema(&self) -> Result<Document> {
        self.schema_with(&HomologueOptions::default())
    }

    /// Emit `{class_name, common?, <name>: {}.., required, optional, field_to_info}`
    pub fn schema_with(&self, options: &HomologueOptions) -> Result<Document> {
        let mut result = Document::new();
        result.insert(
            CLASS_NAME_KEY.to_string(),
            Value::String(self.origin().class_name().to_string()),
        );
        if options.with_common {
            result.insert(COMMON_KEY.to_string(), Value::Object(Document::new()));
        }

        for name in self.homologue_names(options.name_getter_kwargs.as_ref())? {
            let section = self
                .pre_definitions
                .as_ref()
                .and_then(|pre| pre.get(&name))
                .cloned()
                .unwrap_or_else(|| Value::Object(Document::new()));
            result.insert(name, section);
        }

        result.extend(
            self.single_schema
                .schematic()?
                .schema_dict_field_info_extracted(false, false),
        );
        Ok(result)
    }

    /// Constructor arguments for every instance section of the document
    ///
    /// Each instance gets `inferior_config_kwargs`, overridden by `common`,
    /// overridden by its own section. A missing `common` counts as empty.
    pub fn parse_schema<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        inferior_config_kwargs: Option<&Kwargs>,
    ) -> Result<BTreeMap<String, Kwargs>> {
        let document = defined_schema.into().resolve()?;
        let config = configuration_from_mapping(&document, self.mapping_name(), false)?;

        let empty = Document::new();
        let common = match config.get(COMMON_KEY) {
            Some(value) => as_document(value, COMMON_KEY)?,
            None => &empty,
        };

        let reserved = keys_to_not_parse(&HOMOLOGUE_RESERVED_NAMES);
        let mut result = BTreeMap::new();
        for (name, section) in config {
            if reserved.contains(name.as_str()) {
                continue;
            }
            let specific = as_document(section, name)?;

            let mut kwargs = inferior_config_kwargs.cloned().unwrap_or_default();
            overlay(&mut kwargs, common);
            overlay(&mut kwargs, specific);
            result.insert(name.clone(), kwargs);
        }

        Ok(result)
    }

    /// Build every configured instance, keyed by instance name
    pub fn parse_schema_to_instance<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        inferior_config_kwargs: Option<&Kwargs>,
    ) -> Result<BTreeMap<String, T>>
    where
        T: Instance,
    {
        self.parse_schema(defined_schema, inferior_config_kwargs)?
            .into_iter()
            .map(|(name, kwargs)| Ok((name, T::instantiate(self.origin(), kwargs)?)))
            .collect()
    }

    /// Forget the instance type
    pub fn into_any(self) -> HomologueSchema<AnyInstance> {
        HomologueSchema {
            single_schema: self.single_schema.into_any(),
            instance_names: self.instance_names,
            name_getter: self.name_getter,
            schema_alias: self.schema_alias,
            pre_definitions: self.pre_definitions,
        }
    }
}

impl<T: Schemantic> HomologueSchema<T> {
    /// Homologue schema over a fresh [`SingleSchema`] of `T`
    pub fn from_originating_type(
        instance_names: Vec<String>,
        name_getter: Option<NameGetter>,
    ) -> Result<Self> {
        Self::new(SingleSchema::new(), instance_names, name_getter)
    }
}

impl<T> BaseSchema for HomologueSchema<T> {
    type Options = HomologueOptions;

    fn schema_with(&self, options: &HomologueOptions) -> Result<Document> {
        HomologueSchema::schema_with(self, options)
    }
}

impl<T> Clone for HomologueSchema<T> {
    fn clone(&self) -> Self {
        Self {
            single_schema: self.single_schema.clone(),
            instance_names: self.instance_names.clone(),
            name_getter: self.name_getter.clone(),
            schema_alias: self.schema_alias.clone(),
            pre_definitions: self.pre_definitions.clone(),
        }
    }
}

impl<T> fmt::Debug for HomologueSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomologueSchema")
            .field("single_schema", &self.single_schema)
            .field("instance_names", &self.instance_names)
            .field("name_getter", &self.name_getter.is_some())
            .field("schema_alias", &self.schema_alias)
            .finish_non_exhaustive()
    }
}

/// Drop repeated names, keeping the first occurrence
fn dedup(names: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !result.contains(&name) {
            result.push(name);
        }
    }
    result
}
