//! Per-field metadata: type hint plus the defaults each owner declares

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::error::{DefaultDisagreement, Result, SchemaError};
use crate::core::origin::Owner;

/// Type hint of one field and the default every owning type gives it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    type_hint: String,
    owner_to_default: BTreeMap<Owner, Value>,
}

impl FieldMetadata {
    pub fn new(type_hint: impl Into<String>) -> Self {
        Self {
            type_hint: type_hint.into(),
            owner_to_default: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, owner: Owner, default: Value) -> Self {
        self.owner_to_default.insert(owner, default);
        self
    }

    pub fn type_hint(&self) -> &str {
        &self.type_hint
    }

    pub fn owner_to_default(&self) -> &BTreeMap<Owner, Value> {
        &self.owner_to_default
    }

    /// Rendering used in schema documents
    ///
    /// `type_hint`, or `type_hint(default: A -> x; B -> y)` with owners
    /// sorted by name.
    pub fn field_info_string(&self) -> String {
        if self.owner_to_default.is_empty() {
            return self.type_hint.clone();
        }
        let defaults = self
            .owner_to_default
            .iter()
            .map(|(owner, default)| format!("{} -> {}", owner, render_default(default)))
            .collect::<Vec<_>>()
            .join("; ");
        format!("{}(default: {})", self.type_hint, defaults)
    }

    /// Union `other`'s owner defaults into this one
    ///
    /// Both must carry the same type hint, and an owner present on both
    /// sides must declare the same default.
    pub fn merge_owner_to_default_with_other(&mut self, other: &FieldMetadata) -> Result<()> {
        if self.type_hint != other.type_hint {
            return Err(SchemaError::TypeHintMismatch {
                ours: self.type_hint.clone(),
                theirs: other.type_hint.clone(),
            });
        }

        let conflicts: Vec<DefaultDisagreement> = other
            .owner_to_default
            .iter()
            .filter_map(|(owner, theirs)| {
                self.owner_to_default
                    .get(owner)
                    .filter(|ours| *ours != theirs)
                    .map(|ours| DefaultDisagreement {
                        owner: owner.name().to_string(),
                        ours: ours.clone(),
                        theirs: theirs.clone(),
                    })
            })
            .collect();
        if !conflicts.is_empty() {
            return Err(SchemaError::DefaultConflict { conflicts });
        }

        self.owner_to_default.extend(
            other
                .owner_to_default
                .iter()
                .map(|(owner, default)| (owner.clone(), default.clone())),
        );
        Ok(())
    }

    /// Non-mutating form of [`Self::merge_owner_to_default_with_other`]
    pub fn merged(&self, other: &FieldMetadata) -> Result<FieldMetadata> {
        let mut result = self.clone();
        result.merge_owner_to_default_with_other(other)?;
        Ok(result)
    }
}

impl fmt::Display for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field_info_string())
    }
}

fn render_default(default: &Value) -> String {
    match default {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge every entry of `source` into `target`, field by field
pub fn combine_field_metadata(
    target: &mut BTreeMap<String, FieldMetadata>,
    source: &BTreeMap<String, FieldMetadata>,
) -> Result<()> {
    for (field, info) in source {
        match target.get_mut(field) {
            Some(existing) => existing.merge_owner_to_default_with_other(info)?,
            None => {
                target.insert(field.clone(), info.clone());
            }
        }
    }
    Ok(())
}

/// Render a field map as `{name: field_info_string}`, sorted by name
pub fn render_field_to_info(fields: &BTreeMap<String, FieldMetadata>) -> serde_json::Map<String, Value> {
    fields
        .iter()
        .map(|(name, info)| (name.clone(), Value::String(info.field_info_string())))
        .collect()
}
