//! Engine Configuration

use netlens_common::NetLensError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default cap on retained segments per TCP flow
pub const DEFAULT_MAX_SEGMENTS_PER_STREAM: usize = 64;

/// Ports below this are treated as service ports
pub const DEFAULT_WELL_KNOWN_PORT_LIMIT: u16 = 1024;

/// Configuration loading error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for NetLensError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => NetLensError::Io(e),
            other => NetLensError::Config(other.to_string()),
        }
    }
}

/// Classification engine configuration
///
/// Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-MAC accounting and EtherType distribution
    pub layer2: bool,
    /// Per-IP and per-conversation accounting, IP protocol distribution
    pub layer3: bool,
    /// Per-port accounting
    pub layer4: bool,
    /// TCP handshake detection and segment logs
    pub streams: bool,
    /// Segments retained per TCP flow
    pub max_segments_per_stream: usize,
    /// Ports below this limit win the peer-facing port choice
    pub well_known_port_limit: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layer2: true,
            layer3: true,
            layer4: true,
            streams: true,
            max_segments_per_stream: DEFAULT_MAX_SEGMENTS_PER_STREAM,
            well_known_port_limit: DEFAULT_WELL_KNOWN_PORT_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse from a JSON document and validate
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streams && self.max_segments_per_stream == 0 {
            return Err(ConfigError::Invalid(
                "max_segments_per_stream must be at least 1".into(),
            ));
        }
        if self.layer4 && self.well_known_port_limit == 0 {
            return Err(ConfigError::Invalid(
                "well_known_port_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.layer2 && config.layer3 && config.layer4 && config.streams);
        assert_eq!(config.max_segments_per_stream, 64);
        assert_eq!(config.well_known_port_limit, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{ "streams": false, "layer4": false }"#).unwrap();
        assert!(!config.streams);
        assert!(!config.layer4);
        assert!(config.layer2);
        assert_eq!(config.max_segments_per_stream, 64);
    }

    #[test]
    fn test_zero_segment_cap_rejected() {
        let err = EngineConfig::from_json(r#"{ "max_segments_per_stream": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        // Irrelevant when stream tracking is off
        assert!(
            EngineConfig::from_json(r#"{ "streams": false, "max_segments_per_stream": 0 }"#)
                .is_ok()
        );
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json("{ layer2: yes").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(matches!(NetLensError::from(err), NetLensError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("netlens-config-{}.json", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            write!(file, r#"{{ "max_segments_per_stream": 8 }}"#).unwrap();
        }

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.max_segments_per_stream, 8);
        std::fs::remove_file(&path).unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(matches!(NetLensError::from(err), NetLensError::Io(_)));
    }
}
