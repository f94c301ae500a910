//! Runtime configuration.
//!
//! A [`RuntimeConfig`] is handed to [`Runtime::with_config`](crate::Runtime::with_config).
//! Every field has a default, so partial JSON documents are accepted.

use serde::Deserialize;

/// Knobs for a single [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name attached to log records emitted by this runtime.
    pub label: String,

    /// Emit `tracing::warn!` records for non-fatal misuse, such as calling
    /// `to_refs` on a target that was never wrapped.
    pub warn_on_misuse: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            label: "ripple".to_string(),
            warn_on_misuse: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Enable or disable misuse warnings.
    pub fn warn_on_misuse(mut self, enabled: bool) -> Self {
        self.warn_on_misuse = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "label": "editor" }"#).unwrap();
        assert_eq!(config.label, "editor");
        assert!(config.warn_on_misuse);
    }

    #[test]
    fn builder_overrides() {
        let config = RuntimeConfig::default().warn_on_misuse(false).label("x");
        assert_eq!(config.label, "x");
        assert!(!config.warn_on_misuse);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(RuntimeConfig::from_json("{ label: }").is_err());
    }
}
