//! Schema documents and the helpers shared by every schema kind

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::error::{Result, SchemaError};

/// An emitted or loaded schema document (insertion ordered)
pub type Document = Map<String, Value>;

/// Constructor arguments for one origin
pub type Kwargs = Map<String, Value>;

pub const CLASS_NAME_KEY: &str = "class_name";
pub const COMMON_KEY: &str = "common";
pub const DEFINED_KEY: &str = "defined";
pub const REQUIRED_KEY: &str = "required";
pub const OPTIONAL_KEY: &str = "optional";
pub const FIELD_INFO_KEY: &str = "field_to_info";

/// Truthiness of a default value; falsy defaults are not recorded per owner
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Copy every entry of `top` over `base` (later sources win)
pub fn overlay(base: &mut Kwargs, top: &Kwargs) {
    for (key, value) in top {
        base.insert(key.clone(), value.clone());
    }
}

/// View a value as a nested document
pub fn as_document<'d>(value: &'d Value, key: &str) -> Result<&'d Document> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::parse(format!("'{}' must be a mapping, found {}", key, value)))
}

/// Fetch a nested document by key
pub fn sub_document<'d>(source: &'d Document, key: &str) -> Result<&'d Document> {
    let value = source
        .get(key)
        .ok_or_else(|| SchemaError::parse(format!("missing '{}' section", key)))?;
    as_document(value, key)
}

/// Merge `source` into `target`, failing if any key is already present
pub fn update_assert_disjoint(target: &mut Document, source: Document, context: &str) -> Result<()> {
    let keys: Vec<String> = source
        .keys()
        .filter(|key| target.contains_key(*key))
        .cloned()
        .collect();
    if !keys.is_empty() {
        return Err(SchemaError::Collision {
            context: context.to_string(),
            keys,
        });
    }
    target.extend(source);
    Ok(())
}

/// Same as [`update_assert_disjoint`] for named instances
pub fn extend_assert_disjoint<V>(
    target: &mut BTreeMap<String, V>,
    source: BTreeMap<String, V>,
    context: &str,
) -> Result<()> {
    let keys: Vec<String> = source
        .keys()
        .filter(|key| target.contains_key(*key))
        .cloned()
        .collect();
    if !keys.is_empty() {
        return Err(SchemaError::Collision {
            context: context.to_string(),
            keys,
        });
    }
    target.extend(source);
    Ok(())
}

pub(crate) fn names_value<'a>(names: impl IntoIterator<Item = &'a String>) -> Value {
    Value::Array(names.into_iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!("n")));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!([0])));
    }

    #[test]
    fn test_overlay_later_wins() {
        let mut base = doc(json!({"a": 1, "b": 2}));
        overlay(&mut base, &doc(json!({"b": 3, "c": 4})));
        assert_eq!(Value::Object(base), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_update_assert_disjoint_rejects_collision() {
        let mut target = doc(json!({"a": 1}));
        let err = update_assert_disjoint(&mut target, doc(json!({"a": 1, "b": 2})), "group")
            .unwrap_err();
        match err {
            SchemaError::Collision { context, keys } => {
                assert_eq!(context, "group");
                assert_eq!(keys, vec!["a".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was merged
        assert!(!target.contains_key("b"));
    }

    #[test]
    fn test_sub_document_errors() {
        let source = doc(json!({"defined": 3}));
        assert!(matches!(sub_document(&source, "missing"), Err(SchemaError::Parse { .. })));
        assert!(matches!(sub_document(&source, "defined"), Err(SchemaError::Parse { .. })));
    }
}
