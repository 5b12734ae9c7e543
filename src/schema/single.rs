//! Schema of a single type

use serde_json::Value;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::core::document::{overlay, Document, Kwargs, DEFINED_KEY, OPTIONAL_KEY, REQUIRED_KEY};
use crate::core::error::Result;
use crate::core::origin::{AnyInstance, Instance, Origin, Schemantic};
use crate::model::schematic::Schematic;
use crate::schema::options::SingleOptions;
use crate::schema::{configuration_from_mapping, BaseSchema, DefinedSchema};

/// Schema of one origin type
///
/// `T` is what [`SingleSchema::parse_schema_to_instance`] builds: the origin
/// type itself, or [`AnyInstance`] when the schema is type-erased.
pub struct SingleSchema<T = AnyInstance> {
    origin: Origin,
    schema_alias: Option<String>,
    pre_definitions: Option<Document>,
    schematic: OnceCell<Schematic>,
    _instance: PhantomData<fn() -> T>,
}

impl<T: Schemantic> SingleSchema<T> {
    pub fn new() -> Self {
        Self::with_origin(Origin::of::<T>())
    }
}

impl<T: Schemantic> Default for SingleSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleSchema<AnyInstance> {
    /// Type-erased schema of `O`
    pub fn of<O: Schemantic>() -> Self {
        Self::with_origin(Origin::of::<O>())
    }

    pub fn from_origin(origin: Origin) -> Self {
        Self::with_origin(origin)
    }
}

impl<T> SingleSchema<T> {
    fn with_origin(origin: Origin) -> Self {
        Self {
            origin,
            schema_alias: None,
            pre_definitions: None,
            schematic: OnceCell::new(),
            _instance: PhantomData,
        }
    }

    /// Key this schema is stored under in larger documents
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.schema_alias = Some(alias.into());
        self
    }

    /// Field values baked into the emitted template
    pub fn with_pre_definitions(mut self, pre_definitions: Document) -> Self {
        self.pre_definitions = Some(pre_definitions);
        self
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn schema_alias(&self) -> Option<&str> {
        self.schema_alias.as_deref()
    }

    pub fn pre_definitions(&self) -> Option<&Document> {
        self.pre_definitions.as_ref()
    }

    /// The alias, or the origin's class name
    pub fn mapping_name(&self) -> &str {
        self.schema_alias.as_deref().unwrap_or_else(|| self.origin.class_name())
    }

    /// Introspected fields of the origin, computed on first use
    pub fn schematic(&self) -> Result<&Schematic> {
        if let Some(schematic) = self.schematic.get() {
            return Ok(schematic);
        }
        let schematic = Schematic::from_origin(&self.origin)?;
        Ok(self.schematic.get_or_init(|| schematic))
    }

    pub fn schema(&self) -> Result<Document> {
        self.schema_with(&SingleOptions::default())
    }

    /// Emit `{class_name?, defined?, required?, optional?}`
    ///
    /// Pre-definitions go under `defined` when it is emitted, otherwise
    /// they replace the rendered field info of matching fields.
    pub fn schema_with(&self, options: &SingleOptions) -> Result<Document> {
        let mut result = self
            .schematic()?
            .schema_dict(options.with_class_name, options.with_defined);

        let pre_definitions = match &self.pre_definitions {
            Some(pre) if !pre.is_empty() => pre,
            _ => return Ok(result),
        };

        if options.with_defined {
            result.insert(DEFINED_KEY.to_string(), Value::Object(pre_definitions.clone()));
        } else {
            for key in [REQUIRED_KEY, OPTIONAL_KEY] {
                if let Some(Value::Object(fields)) = result.get_mut(key) {
                    for (name, rendered) in fields.iter_mut() {
                        if let Some(value) = pre_definitions.get(name) {
                            *rendered = value.clone();
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// Constructor arguments held in the `defined` section
    ///
    /// `inferior_config_kwargs` is a base the document's values override.
    pub fn parse_schema<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        inferior_config_kwargs: Option<&Kwargs>,
    ) -> Result<Kwargs> {
        let document = defined_schema.into().resolve()?;
        let config = configuration_from_mapping(&document, self.mapping_name(), true)?;

        let mut kwargs = inferior_config_kwargs.cloned().unwrap_or_default();
        overlay(&mut kwargs, config);
        Ok(kwargs)
    }

    /// Build the configured instance, keyed by mapping name
    pub fn parse_schema_to_instance<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        inferior_config_kwargs: Option<&Kwargs>,
    ) -> Result<BTreeMap<String, T>>
    where
        T: Instance,
    {
        let kwargs = self.parse_schema(defined_schema, inferior_config_kwargs)?;
        let instance = T::instantiate(&self.origin, kwargs)?;
        Ok(BTreeMap::from([(self.mapping_name().to_string(), instance)]))
    }

    /// Forget the instance type
    pub fn into_any(self) -> SingleSchema<AnyInstance> {
        SingleSchema {
            origin: self.origin,
            schema_alias: self.schema_alias,
            pre_definitions: self.pre_definitions,
            schematic: self.schematic,
            _instance: PhantomData,
        }
    }
}

impl<T> BaseSchema for SingleSchema<T> {
    type Options = SingleOptions;

    fn schema_with(&self, options: &SingleOptions) -> Result<Document> {
        SingleSchema::schema_with(self, options)
    }
}

impl<T> Clone for SingleSchema<T> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            schema_alias: self.schema_alias.clone(),
            pre_definitions: self.pre_definitions.clone(),
            schematic: self.schematic.clone(),
            _instance: PhantomData,
        }
    }
}

/// Schemas are equal when they describe the same origin
impl<T> PartialEq for SingleSchema<T> {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
    }
}

impl<T> fmt::Debug for SingleSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleSchema")
            .field("origin", &self.origin)
            .field("schema_alias", &self.schema_alias)
            .field("pre_definitions", &self.pre_definitions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SchemaError;
    use crate::core::origin::ExcludableFields;
    use crate::model::introspect::{Param, TypeDescription, TypeHint};
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct C {
        must_be: i64,
        #[serde(default = "default_we")]
        we: String,
    }

    fn default_we() -> String {
        "n".to_string()
    }

    impl ExcludableFields for C {}

    impl Schemantic for C {
        fn describe() -> TypeDescription {
            TypeDescription::signature([
                Param::new("must_be", TypeHint::named("int"), None),
                Param::new("we", TypeHint::named("str"), Some(json!("n"))),
            ])
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_schema() {
        let schema = SingleSchema::<C>::new();
        assert_eq!(
            Value::Object(schema.schema().unwrap()),
            json!({
                "class_name": "C",
                "required": {"must_be": "int"},
                "optional": {"we": "str(default: C -> n)"}
            })
        );
    }

    #[test]
    fn test_schema_with_defined_holds_pre_definitions() {
        let schema = SingleSchema::<C>::new().with_pre_definitions(doc(json!({"must_be": 1})));
        let options = SingleOptions {
            with_defined: true,
            ..Default::default()
        };
        assert_eq!(
            Value::Object(schema.schema_with(&options).unwrap()),
            json!({
                "class_name": "C",
                "defined": {"must_be": 1},
                "required": {"must_be": "int"},
                "optional": {"we": "str(default: C -> n)"}
            })
        );
    }

    #[test]
    fn test_pre_definitions_overlay_rendered_fields() {
        let schema = SingleSchema::<C>::new().with_pre_definitions(doc(json!({"we": "y", "other": 1})));
        assert_eq!(
            Value::Object(schema.schema().unwrap()),
            json!({
                "class_name": "C",
                "required": {"must_be": "int"},
                "optional": {"we": "y"}
            })
        );
    }

    #[test]
    fn test_parse_schema() {
        let schema = SingleSchema::<C>::new();
        let defined = doc(json!({"C": {"defined": {"must_be": 5}}}));
        assert_eq!(
            Value::Object(schema.parse_schema(&defined, None).unwrap()),
            json!({"must_be": 5})
        );
    }

    #[test]
    fn test_parse_schema_round_trips_defined() {
        let schema = SingleSchema::<C>::new().with_pre_definitions(doc(json!({"must_be": 7, "we": "x"})));
        let emitted = schema
            .schema_with(&SingleOptions {
                with_defined: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            Value::Object(schema.parse_schema(&emitted, None).unwrap()),
            json!({"must_be": 7, "we": "x"})
        );
    }

    #[test]
    fn test_parse_schema_with_inferior_kwargs() {
        let schema = SingleSchema::<C>::new();
        let defined = doc(json!({"defined": {"must_be": 5}}));
        let inferior = doc(json!({"must_be": 1, "we": "base"}));
        assert_eq!(
            Value::Object(schema.parse_schema(&defined, Some(&inferior)).unwrap()),
            json!({"must_be": 5, "we": "base"})
        );
    }

    #[test]
    fn test_parse_schema_missing_defined() {
        let schema = SingleSchema::<C>::new();
        let defined = doc(json!({"C": {"must_be": 5}}));
        assert!(matches!(
            schema.parse_schema(&defined, None),
            Err(SchemaError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_schema_to_instance() {
        let schema = SingleSchema::<C>::new().with_alias("c");
        let defined = doc(json!({"c": {"defined": {"must_be": 5}}}));
        let instances = schema.parse_schema_to_instance(&defined, None).unwrap();
        assert_eq!(
            instances.get("c"),
            Some(&C {
                must_be: 5,
                we: "n".to_string()
            })
        );
    }

    #[test]
    fn test_construction_errors_propagate() {
        let schema = SingleSchema::of::<C>();
        let defined = doc(json!({"defined": {"we": "x"}}));
        let err = schema.parse_schema_to_instance(&defined, None).unwrap_err();
        assert!(matches!(err, SchemaError::Instantiation { .. }));
    }

    #[test]
    fn test_erased_schema_builds_any_instance() {
        let schema: SingleSchema = SingleSchema::<C>::new().into_any();
        let defined = doc(json!({"defined": {"must_be": 2}}));
        let mut instances = schema.parse_schema_to_instance(&defined, None).unwrap();
        let instance = instances.remove("C").unwrap();
        assert_eq!(instance.class_name(), "C");
        assert_eq!(instance.downcast_ref::<C>().map(|c| c.must_be), Some(2));
    }

    #[test]
    fn test_equality_by_origin() {
        assert_eq!(SingleSchema::of::<C>(), SingleSchema::of::<C>().with_alias("other"));
    }

    #[test]
    fn test_dump_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.toml");
        let schema = SingleSchema::<C>::new();
        schema.dump(&path, &SingleOptions::default()).unwrap();
        assert_eq!(
            SingleSchema::<C>::load(&path).unwrap(),
            schema.schema().unwrap()
        );
    }
}
