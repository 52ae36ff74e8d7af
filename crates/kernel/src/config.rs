use serde::{Deserialize, Serialize};

/// What the scheduler does when a system returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    /// Abort the rest of the pass and return the error.
    #[default]
    FailFast,
    /// Record the failure, log it, and keep running the remaining systems.
    Continue,
}

/// World configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldConfig {
    pub error_policy: ErrorPolicy,
}

impl WorldConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_fail_fast() {
        assert_eq!(WorldConfig::default().error_policy, ErrorPolicy::FailFast);
        assert_eq!(WorldConfig::from_json("{}").unwrap(), WorldConfig::default());
    }

    #[test]
    fn parses_continue_policy() {
        let config = WorldConfig::from_json(r#"{"errorPolicy":"continue"}"#).unwrap();
        assert_eq!(config.error_policy, ErrorPolicy::Continue);
        assert!(WorldConfig::from_json(r#"{"errorPolicy":"retry"}"#).is_err());
    }
}
