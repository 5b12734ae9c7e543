//! Configuration management with layered hierarchy

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::codec;
use crate::core::error::{Result, SchemaError};
use crate::schema::options::{CultureOptions, GroupOptions, HomologueOptions, SingleOptions};

/// Environment variable toggling every `common` section at once
pub const WITH_COMMON_ENV: &str = "SCHEMANTIC_WITH_COMMON";

/// Default emission options for every schema kind
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub single: SingleOptions,
    pub homologue: HomologueOptions,
    pub group: GroupOptions,
    pub culture: CultureOptions,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    ///
    /// Unreadable or malformed layers are skipped.
    pub fn load() -> Self {
        Self::load_with(None)
    }

    /// Like [`Config::load`], with a project file layered over the global one
    pub fn load_with(project_path: Option<&Path>) -> Self {
        // 1. Built-in defaults
        let mut layered = Value::Object(Default::default());

        // 2. Global user config (<config_dir>/schemantic/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match codec::load(&global_path) {
                    Ok(global) => merge_values(&mut layered, Value::Object(global)),
                    Err(e) => warn!(path = %global_path.display(), error = %e, "skipping global config"),
                }
            }
        }

        // 3. Project config
        if let Some(path) = project_path {
            match codec::load(path) {
                Ok(project) => merge_values(&mut layered, Value::Object(project)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping project config"),
            }
        }

        let mut config = match serde_json::from_value::<Config>(layered) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "layered config is invalid, using defaults");
                Config::default()
            }
        };

        // 4. Environment variables
        if let Ok(raw) = std::env::var(WITH_COMMON_ENV) {
            match parse_flag(&raw) {
                Some(flag) => config.set_with_common(flag),
                None => warn!(value = %raw, "{} must be true or false", WITH_COMMON_ENV),
            }
        }

        config
    }

    /// Load a single config file over the built-in defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let document = codec::load(path)?;
        let config = serde_json::from_value(Value::Object(document)).map_err(|e| {
            SchemaError::parse(format!("invalid config {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "schemantic")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Toggle every `common` section (homologue, group and culture constituents)
    pub fn set_with_common(&mut self, with_common: bool) {
        self.homologue.with_common = with_common;
        self.group.with_common = with_common;
        self.culture.with_micro_common = with_common;
    }
}

/// Merge `other` into `base`, recursing into mappings (other takes precedence)
fn merge_values(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Object(base), Value::Object(other)) => {
            for (key, value) in other {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, other) => *base = other,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
