//! Error taxonomy for schema construction, merging, parsing and file I/O

use miette::Diagnostic;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::codec::diagnostics::SyntaxError;

/// Crate-wide result alias
pub type Result<T, E = SchemaError> = std::result::Result<T, E>;

/// Every failure raised by schema construction, merging, parsing and codecs
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("cannot construct schema for {class_name}: {message}")]
    #[diagnostic(code(schemantic::schema::construction))]
    Construction { class_name: String, message: String },

    #[error("the names {names:?} are not allowed; reserved names: {reserved:?}")]
    #[diagnostic(
        code(schemantic::schema::reserved_name),
        help("Pick another schema alias or instance name")
    )]
    ReservedName {
        names: Vec<String>,
        reserved: Vec<String>,
    },

    #[error("homologue schema for {class_name} needs instance names or a name getter")]
    #[diagnostic(
        code(schemantic::schema::configuration),
        help("Use SingleSchema when there is a single instance rather than homologous ones")
    )]
    Configuration { class_name: String },

    #[error(
        "homologue schema for {class_name} has {count} instance name(s) and no name getter; at least two are needed"
    )]
    #[diagnostic(code(schemantic::schema::arity))]
    Arity { class_name: String, count: usize },

    #[error("owners are defined in both spaces with differing defaults: {}", render_disagreements(.conflicts))]
    #[diagnostic(code(schemantic::field::default_conflict))]
    DefaultConflict { conflicts: Vec<DefaultDisagreement> },

    #[error("cannot merge field metadata typed '{ours}' with '{theirs}'")]
    #[diagnostic(code(schemantic::field::type_hint_mismatch))]
    TypeHintMismatch { ours: String, theirs: String },

    #[error("cannot introspect {class_name}: {message}")]
    #[diagnostic(code(schemantic::model::introspection))]
    Introspection { class_name: String, message: String },

    #[error("malformed schema document: {message}")]
    #[diagnostic(code(schemantic::schema::parse))]
    Parse { message: String },

    #[error("{context} collides with the existing parsimony; colliding keys: {keys:?}")]
    #[diagnostic(code(schemantic::schema::collision))]
    Collision { context: String, keys: Vec<String> },

    #[error("'{suffix}' is unsupported")]
    #[diagnostic(
        code(schemantic::codec::unsupported_format),
        help("Use a .toml, .yaml or .yml file")
    )]
    UnsupportedFormat { suffix: String },

    #[error("failed to construct {class_name}")]
    #[diagnostic(code(schemantic::origin::instantiation))]
    Instantiation {
        class_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("failed to serialize schema document: {0}")]
    Serialize(String),
}

impl SchemaError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        SchemaError::Parse {
            message: message.into(),
        }
    }

    /// Whether this error is a build-time invariant violation
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            SchemaError::Construction { .. }
                | SchemaError::ReservedName { .. }
                | SchemaError::Configuration { .. }
                | SchemaError::Arity { .. }
        )
    }
}

/// One owner whose default differs between two merged field descriptions
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultDisagreement {
    pub owner: String,
    pub ours: Value,
    pub theirs: Value,
}

impl fmt::Display for DefaultDisagreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} != {}", self.owner, self.ours, self.theirs)
    }
}

fn render_disagreements(conflicts: &[DefaultDisagreement]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_conflict_message_lists_owners() {
        let err = SchemaError::DefaultConflict {
            conflicts: vec![DefaultDisagreement {
                owner: "Engine".to_string(),
                ours: json!("a"),
                theirs: json!("b"),
            }],
        };
        let message = err.to_string();
        assert!(message.contains("Engine: \"a\" != \"b\""));
    }

    #[test]
    fn test_construction_family() {
        let arity = SchemaError::Arity {
            class_name: "Engine".to_string(),
            count: 1,
        };
        assert!(arity.is_construction_error());
        assert!(!SchemaError::parse("missing").is_construction_error());
    }
}
