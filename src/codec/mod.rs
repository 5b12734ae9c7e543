//! Load and dump schema documents as TOML or YAML files

pub mod diagnostics;

use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::core::document::Document;
use crate::core::error::{Result, SchemaError};

pub use diagnostics::SyntaxError;

/// File formats a schema document can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
}

impl Format {
    /// Determine the format from the file suffix
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some(other) => Err(SchemaError::UnsupportedFormat {
                suffix: format!(".{}", other),
            }),
            None => Err(SchemaError::UnsupportedFormat {
                suffix: String::new(),
            }),
        }
    }

    pub fn codec(&self) -> &'static dyn ConfigCodec {
        match self {
            Format::Toml => &TomlCodec,
            Format::Yaml => &YamlCodec,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Toml => write!(f, "TOML"),
            Format::Yaml => write!(f, "YAML"),
        }
    }
}

/// Text encoding of schema documents
pub trait ConfigCodec {
    fn format(&self) -> Format;

    /// Parse `source`; `filename` is only used for diagnostics
    fn decode(&self, source: &str, filename: &str) -> Result<Document>;

    fn encode(&self, document: &Document) -> Result<String>;
}

pub struct TomlCodec;

impl ConfigCodec for TomlCodec {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn decode(&self, source: &str, filename: &str) -> Result<Document> {
        toml::from_str::<Document>(source)
            .map_err(|e| SyntaxError::from_toml_error(&e, source, filename).into())
    }

    fn encode(&self, document: &Document) -> Result<String> {
        toml::to_string(document).map_err(|e| SchemaError::Serialize(e.to_string()))
    }
}

pub struct YamlCodec;

impl ConfigCodec for YamlCodec {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn decode(&self, source: &str, filename: &str) -> Result<Document> {
        let value: Value = serde_yml::from_str(source)
            .map_err(|e| SyntaxError::from_yaml_error(&e, source, filename))?;
        match value {
            Value::Object(document) => Ok(document),
            // An empty file holds no document
            Value::Null => Ok(Document::new()),
            other => Err(SchemaError::parse(format!(
                "the root of {} must be a mapping, found {}",
                filename, other
            ))),
        }
    }

    fn encode(&self, document: &Document) -> Result<String> {
        serde_yml::to_string(document).map_err(|e| SchemaError::Serialize(e.to_string()))
    }
}

/// Read a schema document, picking the codec from the file suffix
pub fn load(path: &Path) -> Result<Document> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let document = format.codec().decode(&content, &filename)?;
    debug!(path = %path.display(), %format, keys = document.len(), "loaded schema document");
    Ok(document)
}

/// Write a schema document, picking the codec from the file suffix
pub fn dump(path: &Path, document: &Document) -> Result<()> {
    let format = Format::from_path(path)?;
    let content = format.codec().encode(document)?;
    fs::write(path, content)?;
    debug!(path = %path.display(), %format, "dumped schema document");
    Ok(())
}
