//! Error taxonomy for the layer engine.
//!
//! A stale layer reference or a rule that evaluates to `false` are normal
//! outcomes and never show up here.

use layers_state::StorageError;

use crate::scripting::ScriptError;

/// Errors that fail the current response.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("layer store error: {0}")]
    Storage(#[from] StorageError),

    #[error("rule for layer '{layer}' failed: {source}")]
    Script {
        layer: String,
        #[source]
        source: ScriptError,
    },

    #[error("scripting engine not registered: {0}")]
    ScriptingEngineNotFound(String),

    #[error("required service unavailable: {0}")]
    ServiceUnavailable(&'static str),

    #[error("zone '{zone}' not found in layout (widget {widget})")]
    ZoneNotFound { zone: String, widget: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for layer engine operations.
pub type Result<T> = std::result::Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_error_display() {
        let err = LayerError::ZoneNotFound {
            zone: "Sidebar".to_string(),
            widget: "abc".to_string(),
        };
        assert!(err.to_string().contains("zone 'Sidebar' not found"));

        let err = LayerError::ServiceUnavailable("theme manager");
        assert!(err.to_string().contains("theme manager"));
    }

    #[test]
    fn test_script_error_keeps_layer_name() {
        let err = LayerError::Script {
            layer: "Homepage".to_string(),
            source: ScriptError::UnknownMethod("nope".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("Homepage"));
        assert!(msg.contains("nope"));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: LayerError = StorageError::Unavailable("down".to_string()).into();
        assert!(matches!(err, LayerError::Storage(_)));
    }
}
