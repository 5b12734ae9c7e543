//! Emission options for each schema kind

use serde::Deserialize;

use crate::core::document::Kwargs;

/// Options for [`SingleSchema`](crate::schema::SingleSchema) emission
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SingleOptions {
    pub with_class_name: bool,
    /// Emit a `defined` section holding the pre-definitions
    pub with_defined: bool,
}

impl Default for SingleOptions {
    fn default() -> Self {
        Self {
            with_class_name: true,
            with_defined: false,
        }
    }
}

/// Options for [`HomologueSchema`](crate::schema::HomologueSchema) emission
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomologueOptions {
    /// Arguments passed to the name getter; without them the getter is not called
    pub name_getter_kwargs: Option<Kwargs>,
    pub with_common: bool,
}

impl Default for HomologueOptions {
    fn default() -> Self {
        Self {
            name_getter_kwargs: None,
            with_common: true,
        }
    }
}

/// Options for [`GroupSchema`](crate::schema::GroupSchema) emission
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupOptions {
    pub with_defined: bool,
    pub with_common: bool,
    pub with_required: bool,
    pub with_optional: bool,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            with_defined: true,
            with_common: true,
            with_required: true,
            with_optional: true,
        }
    }
}

/// Options for [`CultureSchema`](crate::schema::CultureSchema) emission
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CultureOptions {
    /// Emit the culture-wide `field_to_info` section
    pub with_global_common: bool,
    /// Emit the `common` section of homologue and group constituents
    pub with_micro_common: bool,
    pub homologue_name_getter_kwargs: Option<Kwargs>,
}

impl Default for CultureOptions {
    fn default() -> Self {
        Self {
            with_global_common: true,
            with_micro_common: true,
            homologue_name_getter_kwargs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let single = SingleOptions::default();
        assert!(single.with_class_name);
        assert!(!single.with_defined);
        assert!(HomologueOptions::default().with_common);
        assert!(GroupOptions::default().with_defined);
        assert!(CultureOptions::default().with_micro_common);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let group: GroupOptions = serde_yml::from_str("with_common: false\n").unwrap();
        assert!(!group.with_common);
        assert!(group.with_defined);
        assert!(group.with_required);
        assert!(group.with_optional);
    }

    #[test]
    fn test_name_getter_kwargs_from_yaml() {
        let options: HomologueOptions = serde_yml::from_str("name_getter_kwargs:\n  count: 3\n").unwrap();
        let kwargs = options.name_getter_kwargs.unwrap();
        assert_eq!(kwargs.get("count"), Some(&serde_json::json!(3)));
    }
}
