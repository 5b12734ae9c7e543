//! Schema system - template emission and parsing for every schema kind

pub mod culture;
pub mod group;
pub mod homologue;
pub mod options;
pub mod single;

pub use culture::{CultureSchema, SourceSchema};
pub use group::{FieldMetadataSchema, GroupSchema, GROUP_RESERVED_NAMES};
pub use homologue::{HomologueSchema, NameGetter, HOMOLOGUE_RESERVED_NAMES};
pub use options::{CultureOptions, GroupOptions, HomologueOptions, SingleOptions};
pub use single::SingleSchema;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::core::document::{as_document, sub_document, Document, DEFINED_KEY, OPTIONAL_KEY, REQUIRED_KEY};
use crate::core::error::Result;

/// A configuration document to parse, given directly or as a file to load
#[derive(Debug, Clone, Copy)]
pub enum DefinedSchema<'a> {
    Document(&'a Document),
    Path(&'a Path),
}

impl<'a> DefinedSchema<'a> {
    /// Borrow the document, loading it first when given a path
    pub fn resolve(self) -> Result<Cow<'a, Document>> {
        match self {
            DefinedSchema::Document(document) => Ok(Cow::Borrowed(document)),
            DefinedSchema::Path(path) => codec::load(path).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a Document> for DefinedSchema<'a> {
    fn from(document: &'a Document) -> Self {
        DefinedSchema::Document(document)
    }
}

impl<'a> From<&'a Path> for DefinedSchema<'a> {
    fn from(path: &'a Path) -> Self {
        DefinedSchema::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for DefinedSchema<'a> {
    fn from(path: &'a PathBuf) -> Self {
        DefinedSchema::Path(path.as_path())
    }
}

/// Behaviour shared by every schema kind
pub trait BaseSchema {
    type Options: Default;

    /// Emit the schema document
    fn schema_with(&self, options: &Self::Options) -> Result<Document>;

    /// Emit the schema and write it as TOML or YAML, chosen by suffix
    fn dump(&self, path: &Path, options: &Self::Options) -> Result<()> {
        codec::Format::from_path(path)?;
        let document = self.schema_with(options)?;
        codec::dump(path, &document)
    }

    /// Read a schema document written by [`BaseSchema::dump`] or by hand
    fn load(path: &Path) -> Result<Document>
    where
        Self: Sized,
    {
        codec::load(path)
    }
}

/// Top-level keys of a document that never name an instance or member
pub(crate) fn keys_to_not_parse(reserved: &[&'static str]) -> BTreeSet<&'static str> {
    let mut keys: BTreeSet<&'static str> = reserved.iter().copied().collect();
    keys.insert(REQUIRED_KEY);
    keys.insert(OPTIONAL_KEY);
    keys
}

/// Unwrap the section stored under `mapping_name`
///
/// A document without that key is taken to be the section itself.
pub(crate) fn configuration_from_mapping<'d>(
    source: &'d Document,
    mapping_name: &str,
    stored_in_defined: bool,
) -> Result<&'d Document> {
    let section = match source.get(mapping_name) {
        Some(value) => as_document(value, mapping_name)?,
        None => source,
    };
    if stored_in_defined {
        sub_document(section, DEFINED_KEY)
    } else {
        Ok(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SchemaError;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_configuration_from_mapping_unwraps_named_section() {
        let source = doc(json!({"C": {"defined": {"must_be": 5}}}));
        let section = configuration_from_mapping(&source, "C", true).unwrap();
        assert_eq!(Value::Object(section.clone()), json!({"must_be": 5}));
    }

    #[test]
    fn test_configuration_from_mapping_accepts_unwrapped_section() {
        let source = doc(json!({"defined": {"must_be": 5}}));
        let section = configuration_from_mapping(&source, "C", true).unwrap();
        assert_eq!(Value::Object(section.clone()), json!({"must_be": 5}));
        assert_eq!(configuration_from_mapping(&source, "C", false).unwrap(), &source);
    }

    #[test]
    fn test_configuration_from_mapping_requires_defined() {
        let source = doc(json!({"C": {"required": ["must_be"]}}));
        let err = configuration_from_mapping(&source, "C", true).unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }

    #[test]
    fn test_keys_to_not_parse() {
        let keys = keys_to_not_parse(&["common"]);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["common", "optional", "required"]);
    }

    #[test]
    fn test_defined_schema_resolves_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defined.yaml");
        std::fs::write(&path, "C:\n  defined:\n    must_be: 5\n").unwrap();

        let resolved = DefinedSchema::from(&path).resolve().unwrap();
        assert_eq!(Value::Object(resolved.into_owned()), json!({"C": {"defined": {"must_be": 5}}}));
    }
}
