//! Builder configuration

use serde::{Deserialize, Serialize};

use crate::error::TriggerResult;

/// Options controlling trigger generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Log portability warnings for the other dialects
    pub show_warnings: bool,
    /// Fail generation on the first portability warning
    pub strict_portability: bool,
    /// Suffix appended to derived trigger names
    pub name_suffix: String,
}

impl BuilderOptions {
    pub fn from_json(json: &str) -> TriggerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            show_warnings: true,
            strict_portability: false,
            name_suffix: "_tr".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriggerError;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = BuilderOptions::from_json(r#"{ "show_warnings": false }"#).unwrap();

        assert!(!options.show_warnings);
        assert!(!options.strict_portability);
        assert_eq!(options.name_suffix, "_tr");
    }

    #[test]
    fn test_invalid_json() {
        let err = BuilderOptions::from_json(r#"{ "show_warnings": "yes" }"#).unwrap_err();
        assert!(matches!(err, TriggerError::Configuration(_)));
    }
}
