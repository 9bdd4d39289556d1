//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

/// Default cache key for the metadata snapshot.
pub const DEFAULT_CACHE_KEY: &str = "layers.filter:all-widgets";

/// Default change token raised when layers or widget assignments change.
pub const LAYER_CHANGE_TOKEN: &str = "layers.metadata.changed";

/// Default scripting engine used to evaluate layer rules.
pub const DEFAULT_SCRIPT_ENGINE: &str = "expr";

/// Configuration for the layer engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    /// Name of the scripting engine that evaluates rules (default: "expr")
    pub script_engine: String,
    /// Cache key for the cross-request metadata snapshot
    pub cache_key: String,
    /// Change token whose signal invalidates the snapshot
    pub change_token: String,
    /// Base CSS class added to every placed widget (default: "widget")
    pub widget_class: String,
    /// Whether layouts create missing zones on demand
    pub on_demand_zones: bool,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            script_engine: DEFAULT_SCRIPT_ENGINE.to_string(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            change_token: LAYER_CHANGE_TOKEN.to_string(),
            widget_class: "widget".to_string(),
            on_demand_zones: true,
        }
    }
}

impl LayersConfig {
    /// Set the scripting engine name
    pub fn with_script_engine(mut self, engine: impl Into<String>) -> Self {
        self.script_engine = engine.into();
        self
    }

    /// Set the metadata cache key
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    /// Set the change token name
    pub fn with_change_token(mut self, token: impl Into<String>) -> Self {
        self.change_token = token.into();
        self
    }

    /// Enable or disable on-demand zone creation
    pub fn with_on_demand_zones(mut self, enabled: bool) -> Self {
        self.on_demand_zones = enabled;
        self
    }

    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let on_demand_zones = match std::env::var("LAYERS_ON_DEMAND_ZONES") {
            Ok(v) => parse_flag(&v).ok_or_else(|| {
                LayerError::Config(format!("LAYERS_ON_DEMAND_ZONES must be a boolean, got '{v}'"))
            })?,
            Err(_) => defaults.on_demand_zones,
        };

        let config = Self {
            script_engine: std::env::var("LAYERS_SCRIPT_ENGINE")
                .unwrap_or(defaults.script_engine),
            cache_key: std::env::var("LAYERS_CACHE_KEY").unwrap_or(defaults.cache_key),
            change_token: std::env::var("LAYERS_CHANGE_TOKEN").unwrap_or(defaults.change_token),
            widget_class: defaults.widget_class,
            on_demand_zones,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject empty names.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("script_engine", &self.script_engine),
            ("cache_key", &self.cache_key),
            ("change_token", &self.change_token),
            ("widget_class", &self.widget_class),
        ] {
            if value.trim().is_empty() {
                return Err(LayerError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LayersConfig::default();
        assert_eq!(config.script_engine, "expr");
        assert_eq!(config.cache_key, DEFAULT_CACHE_KEY);
        assert_eq!(config.change_token, LAYER_CHANGE_TOKEN);
        assert!(config.on_demand_zones);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LayersConfig =
            serde_json::from_str(r#"{ "on_demand_zones": false }"#).unwrap();
        assert!(!config.on_demand_zones);
        assert_eq!(config.widget_class, "widget");
    }

    #[test]
    fn test_empty_engine_rejected() {
        let config = LayersConfig::default().with_script_engine(" ");
        assert!(matches!(config.validate(), Err(LayerError::Config(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
