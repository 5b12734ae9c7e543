//! A collection of single, homologue and group schemas under one document

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::core::document::{
    extend_assert_disjoint, names_value, sub_document, update_assert_disjoint, Document, FIELD_INFO_KEY,
    OPTIONAL_KEY, REQUIRED_KEY,
};
use crate::core::error::{Result, SchemaError};
use crate::core::origin::AnyInstance;
use crate::model::field_info::{combine_field_metadata, render_field_to_info, FieldMetadata};
use crate::schema::group::{FieldMetadataSchema, GroupSchema};
use crate::schema::homologue::HomologueSchema;
use crate::schema::options::{CultureOptions, GroupOptions, HomologueOptions, SingleOptions};
use crate::schema::single::SingleSchema;
use crate::schema::{BaseSchema, DefinedSchema};

/// One constituent of a [`CultureSchema`]
#[derive(Debug, Clone)]
pub enum SourceSchema {
    Single(SingleSchema),
    Homologue(HomologueSchema),
    Group(GroupSchema),
}

impl SourceSchema {
    pub fn mapping_name(&self) -> &str {
        match self {
            SourceSchema::Single(schema) => schema.mapping_name(),
            SourceSchema::Homologue(schema) => schema.mapping_name(),
            SourceSchema::Group(schema) => schema.mapping_name(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SourceSchema::Single(_) => "single",
            SourceSchema::Homologue(_) => "homologue",
            SourceSchema::Group(_) => "group",
        }
    }
}

impl From<SingleSchema> for SourceSchema {
    fn from(schema: SingleSchema) -> Self {
        SourceSchema::Single(schema)
    }
}

impl From<HomologueSchema> for SourceSchema {
    fn from(schema: HomologueSchema) -> Self {
        SourceSchema::Homologue(schema)
    }
}

impl From<GroupSchema> for SourceSchema {
    fn from(schema: GroupSchema) -> Self {
        SourceSchema::Group(schema)
    }
}

/// Top-level collection of heterogeneous schemas, each under its mapping name
#[derive(Debug, Clone)]
pub struct CultureSchema {
    sources: Vec<SourceSchema>,
}

impl CultureSchema {
    pub fn new(sources: impl IntoIterator<Item = SourceSchema>) -> Result<Self> {
        let sources: Vec<SourceSchema> = sources.into_iter().collect();

        let mut seen = BTreeSet::new();
        for source in &sources {
            let name = source.mapping_name();
            if name == FIELD_INFO_KEY {
                return Err(SchemaError::ReservedName {
                    names: vec![name.to_string()],
                    reserved: vec![FIELD_INFO_KEY.to_string()],
                });
            }
            if !seen.insert(name) {
                return Err(SchemaError::Construction {
                    class_name: name.to_string(),
                    message: format!("the mapping name '{}' is used by more than one schema", name),
                });
            }
        }

        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[SourceSchema] {
        &self.sources
    }

    pub fn schema(&self) -> Result<Document> {
        self.schema_with(&CultureOptions::default())
    }

    /// Emit every constituent's document under its mapping name
    ///
    /// The culture-wide `field_to_info` merges the field metadata of every
    /// constituent; disagreeing defaults of one owner fail the merge.
    pub fn schema_with(&self, options: &CultureOptions) -> Result<Document> {
        let mut result = Document::new();
        let mut fields: BTreeMap<String, FieldMetadata> = BTreeMap::new();

        for source in &self.sources {
            let section = match source {
                SourceSchema::Single(schema) => {
                    let mut section = schema.schema_with(&SingleOptions {
                        with_class_name: true,
                        with_defined: true,
                    })?;
                    combine_field_metadata(&mut fields, schema.schematic()?.field_to_info())?;
                    for key in [REQUIRED_KEY, OPTIONAL_KEY] {
                        let names = match section.get(key) {
                            Some(Value::Object(rendered)) => names_value(rendered.keys()),
                            _ => continue,
                        };
                        section.insert(key.to_string(), names);
                    }
                    section
                }
                SourceSchema::Homologue(schema) => {
                    let mut section = schema.schema_with(&HomologueOptions {
                        name_getter_kwargs: options.homologue_name_getter_kwargs.clone(),
                        with_common: options.with_micro_common,
                    })?;
                    combine_field_metadata(&mut fields, schema.single_schema().schematic()?.field_to_info())?;
                    section.remove(FIELD_INFO_KEY);
                    section
                }
                SourceSchema::Group(schema) => {
                    let FieldMetadataSchema {
                        document,
                        field_to_info,
                    } = schema.schema_with_field_metadata(&GroupOptions {
                        with_common: options.with_micro_common,
                        ..GroupOptions::default()
                    })?;
                    combine_field_metadata(&mut fields, &field_to_info)?;
                    document
                }
            };
            debug!(
                mapping_name = source.mapping_name(),
                kind = source.kind(),
                "emitted culture constituent"
            );
            result.insert(source.mapping_name().to_string(), Value::Object(section));
        }

        if options.with_global_common {
            result.insert(FIELD_INFO_KEY.to_string(), Value::Object(render_field_to_info(&fields)));
        }
        Ok(result)
    }

    /// Parse every constituent's section
    ///
    /// With `keep_mapping_names`, each result sits under its constituent's
    /// mapping name. Otherwise single results are keyed by class name and
    /// homologue and group results are merged flat; any repeated key fails
    /// with a collision error.
    pub fn parse_schema<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
        keep_mapping_names: bool,
    ) -> Result<Document> {
        let document = defined_schema.into().resolve()?;
        let mut result = Document::new();

        for source in &self.sources {
            let mapping_name = source.mapping_name();
            let section = sub_document(&document, mapping_name)?;

            let parsed = match source {
                SourceSchema::Single(schema) => {
                    let kwargs = schema.parse_schema(section, None)?;
                    if !keep_mapping_names {
                        let flat = Document::from_iter([(
                            schema.origin().class_name().to_string(),
                            Value::Object(kwargs),
                        )]);
                        update_assert_disjoint(&mut result, flat, mapping_name)?;
                        continue;
                    }
                    kwargs
                }
                SourceSchema::Homologue(schema) => named_kwargs(schema.parse_schema(section, None)?),
                SourceSchema::Group(schema) => named_kwargs(schema.parse_schema(section, None)?),
            };

            if keep_mapping_names {
                result.insert(mapping_name.to_string(), Value::Object(parsed));
            } else {
                update_assert_disjoint(&mut result, parsed, mapping_name)?;
            }
        }

        Ok(result)
    }

    /// Build every configured instance, merged flat
    ///
    /// Names must be unique across all constituents.
    pub fn parse_schema_to_instance<'a>(
        &self,
        defined_schema: impl Into<DefinedSchema<'a>>,
    ) -> Result<BTreeMap<String, AnyInstance>> {
        let document = defined_schema.into().resolve()?;
        let mut result = BTreeMap::new();

        for source in &self.sources {
            let mapping_name = source.mapping_name();
            let section = sub_document(&document, mapping_name)?;
            let instances = match source {
                SourceSchema::Single(schema) => schema.parse_schema_to_instance(section, None)?,
                SourceSchema::Homologue(schema) => schema.parse_schema_to_instance(section, None)?,
                SourceSchema::Group(schema) => schema.parse_schema_to_instance(section, None)?,
            };
            extend_assert_disjoint(&mut result, instances, mapping_name)?;
        }

        Ok(result)
    }
}

impl BaseSchema for CultureSchema {
    type Options = CultureOptions;

    fn schema_with(&self, options: &CultureOptions) -> Result<Document> {
        CultureSchema::schema_with(self, options)
    }
}

fn named_kwargs(parsed: BTreeMap<String, Document>) -> Document {
    parsed
        .into_iter()
        .map(|(name, kwargs)| (name, Value::Object(kwargs)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::origin::{ExcludableFields, Origin, Schemantic};
    use crate::model::introspect::{Param, TypeDescription, TypeHint};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pump {
        rate: i64,
        #[serde(default = "default_fluid")]
        fluid: String,
    }

    fn default_fluid() -> String {
        "water".to_string()
    }

    impl ExcludableFields for Pump {}

    impl Schemantic for Pump {
        fn describe() -> TypeDescription {
            TypeDescription::signature([
                Param::new("rate", TypeHint::named("int"), None),
                Param::new("fluid", TypeHint::named("str"), Some(json!("water"))),
            ])
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Valve {
        rate: i64,
    }

    impl ExcludableFields for Valve {}

    impl Schemantic for Valve {
        fn describe() -> TypeDescription {
            TypeDescription::signature([Param::new("rate", TypeHint::named("int"), None)])
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Tank {
        volume: f64,
    }

    impl ExcludableFields for Tank {}

    impl Schemantic for Tank {
        fn describe() -> TypeDescription {
            TypeDescription::signature([Param::new("volume", TypeHint::named("float"), None)])
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn culture() -> CultureSchema {
        CultureSchema::new([
            SourceSchema::from(SingleSchema::of::<Tank>()),
            SourceSchema::from(
                HomologueSchema::from_names(SingleSchema::of::<Pump>(), ["p1", "p2"])
                    .unwrap()
                    .with_alias("pumps"),
            ),
            SourceSchema::from(
                GroupSchema::from_origins("plumbing", [Origin::of::<Pump>(), Origin::of::<Valve>()]).unwrap(),
            ),
        ])
        .unwrap()
    }

    fn defined() -> Document {
        doc(json!({
            "Tank": {"class_name": "Tank", "defined": {"volume": 2.5}},
            "pumps": {"common": {"rate": 1}, "p1": {}, "p2": {"fluid": "oil"}},
            "plumbing": {
                "common": {"defined": {"rate": 3}},
                "Pump": {"defined": {}},
                "Valve": {"defined": {"rate": 4}}
            }
        }))
    }

    #[test]
    fn test_schema() {
        assert_eq!(
            Value::Object(culture().schema().unwrap()),
            json!({
                "Tank": {
                    "class_name": "Tank",
                    "defined": {},
                    "required": ["volume"]
                },
                "pumps": {
                    "class_name": "Pump",
                    "common": {},
                    "p1": {},
                    "p2": {},
                    "required": ["rate"],
                    "optional": ["fluid"]
                },
                "plumbing": {
                    "common": {"defined": {}, "required": ["rate"], "optional": ["fluid"]},
                    "Pump": {"class_name": "Pump", "defined": {}, "required": ["rate"], "optional": ["fluid"]},
                    "Valve": {"class_name": "Valve", "defined": {}, "required": ["rate"]}
                },
                "field_to_info": {
                    "fluid": "str(default: Pump -> water)",
                    "rate": "int",
                    "volume": "float"
                }
            })
        );
    }

    #[test]
    fn test_schema_without_common_sections() {
        let options = CultureOptions {
            with_global_common: false,
            with_micro_common: false,
            ..Default::default()
        };
        let emitted = culture().schema_with(&options).unwrap();
        assert!(!emitted.contains_key("field_to_info"));
        assert!(emitted["pumps"].get("common").is_none());
        assert!(emitted["plumbing"].get("common").is_none());
    }

    #[test]
    fn test_homologue_name_getter_kwargs_are_forwarded() {
        let pumps = HomologueSchema::from_name_getter(SingleSchema::of::<Pump>(), |kwargs: &crate::Kwargs| {
            let count = kwargs.get("count").and_then(Value::as_u64).unwrap_or(0);
            (1..=count).map(|i| format!("p{}", i)).collect()
        })
        .unwrap();
        let culture = CultureSchema::new([SourceSchema::from(pumps)]).unwrap();
        let options = CultureOptions {
            homologue_name_getter_kwargs: Some(doc(json!({"count": 3}))),
            ..Default::default()
        };
        let emitted = culture.schema_with(&options).unwrap();
        let section = emitted["Pump"].as_object().unwrap();
        assert!(section.contains_key("p1"));
        assert!(section.contains_key("p3"));
    }

    #[test]
    fn test_mismatched_type_hints_fail() {
        #[derive(Debug, Deserialize)]
        struct Gauge {}
        impl ExcludableFields for Gauge {}
        impl Schemantic for Gauge {
            fn describe() -> TypeDescription {
                TypeDescription::signature([Param::new("rate", TypeHint::named("float"), None)])
            }
        }

        let culture = CultureSchema::new([
            SourceSchema::from(SingleSchema::of::<Valve>()),
            SourceSchema::from(SingleSchema::of::<Gauge>()),
        ])
        .unwrap();
        assert!(matches!(culture.schema(), Err(SchemaError::TypeHintMismatch { .. })));
    }

    #[test]
    fn test_parse_schema_keeps_mapping_names() {
        let parsed = culture().parse_schema(&defined(), true).unwrap();
        assert_eq!(
            Value::Object(parsed),
            json!({
                "Tank": {"volume": 2.5},
                "pumps": {
                    "p1": {"rate": 1},
                    "p2": {"rate": 1, "fluid": "oil"}
                },
                "plumbing": {
                    "Pump": {"rate": 3},
                    "Valve": {"rate": 4}
                }
            })
        );
    }

    #[test]
    fn test_parse_schema_flat() {
        let parsed = culture().parse_schema(&defined(), false).unwrap();
        assert_eq!(
            Value::Object(parsed),
            json!({
                "Tank": {"volume": 2.5},
                "p1": {"rate": 1},
                "p2": {"rate": 1, "fluid": "oil"},
                "Pump": {"rate": 3},
                "Valve": {"rate": 4}
            })
        );
    }

    #[test]
    fn test_parse_schema_flat_collision() {
        let culture = CultureSchema::new([
            SourceSchema::from(HomologueSchema::from_names(SingleSchema::of::<Pump>(), ["Valve", "p2"]).unwrap()),
            SourceSchema::from(
                GroupSchema::from_origins("plumbing", [Origin::of::<Pump>(), Origin::of::<Valve>()]).unwrap(),
            ),
        ])
        .unwrap();
        let defined = doc(json!({
            "Pump": {"common": {"rate": 1}, "Valve": {}, "p2": {}},
            "plumbing": {"Pump": {"defined": {"rate": 2}}, "Valve": {"defined": {"rate": 3}}}
        }));

        // Kept mapping names do not collide
        assert!(culture.parse_schema(&defined, true).is_ok());

        match culture.parse_schema(&defined, false).unwrap_err() {
            SchemaError::Collision { context, keys } => {
                assert_eq!(context, "plumbing");
                assert_eq!(keys, vec!["Valve".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            culture.parse_schema_to_instance(&defined),
            Err(SchemaError::Collision { .. })
        ));
    }

    #[test]
    fn test_parse_schema_missing_section() {
        let defined = doc(json!({"Tank": {"defined": {"volume": 1.0}}}));
        assert!(matches!(
            culture().parse_schema(&defined, true),
            Err(SchemaError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_schema_to_instance() {
        let instances = culture().parse_schema_to_instance(&defined()).unwrap();
        assert_eq!(
            instances.keys().collect::<Vec<_>>(),
            vec!["Pump", "Tank", "Valve", "p1", "p2"]
        );
        assert_eq!(instances["Tank"].downcast_ref::<Tank>(), Some(&Tank { volume: 2.5 }));
        assert_eq!(
            instances["p2"].downcast_ref::<Pump>(),
            Some(&Pump {
                rate: 1,
                fluid: "oil".to_string()
            })
        );
        assert_eq!(instances["Valve"].downcast_ref::<Valve>(), Some(&Valve { rate: 4 }));
    }

    #[test]
    fn test_construction_rejects_duplicate_mapping_names() {
        let err = CultureSchema::new([
            SourceSchema::from(SingleSchema::of::<Tank>()),
            SourceSchema::from(SingleSchema::of::<Valve>().with_alias("Tank")),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::Construction { .. }));
    }

    #[test]
    fn test_construction_rejects_field_to_info_name() {
        let err = CultureSchema::new([SourceSchema::from(SingleSchema::of::<Tank>().with_alias("field_to_info"))]).unwrap_err();
        assert!(matches!(err, SchemaError::ReservedName { .. }));
    }
}
