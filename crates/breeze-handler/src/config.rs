//! Runtime configuration
//!
//! Loaded from YAML. Every field has a default, so a missing file or a
//! partial file is always valid.

use breeze_filters::DetectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level Breeze configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreezeConfig {
    /// Minimum gap between two messages from one sender
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Notice sent to a sender whose message was rate limited
    #[serde(default = "default_spam_notice")]
    pub spam_notice: String,

    /// Upper bound on a custom handler invocation
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,

    /// Detection layers
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Where the extensions directory lives
    #[serde(default)]
    pub install: InstallConfig,
}

impl BreezeConfig {
    /// Load configuration from a YAML file, or defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> breeze_core::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            breeze_core::Error::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> breeze_core::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for BreezeConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            spam_notice: default_spam_notice(),
            handler_timeout_ms: default_handler_timeout_ms(),
            detection: DetectionConfig::default(),
            install: InstallConfig::default(),
        }
    }
}

/// Installation options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Fall back to `./extra/breeze/` outside a managed server layout
    #[serde(default)]
    pub use_cwd_for_extra: bool,

    /// Explicit installation root; wins over detection
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_cooldown_ms() -> u64 {
    500
}

fn default_spam_notice() -> String {
    "You're sending messages too fast!".to_string()
}

fn default_handler_timeout_ms() -> u64 {
    2_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = BreezeConfig::load("/nonexistent/breeze.yaml").unwrap();
        assert_eq!(config.cooldown(), Duration::from_millis(500));
        assert_eq!(config.handler_timeout(), Duration::from_secs(2));
        assert!(!config.install.use_cwd_for_extra);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breeze.yaml");
        std::fs::write(
            &path,
            r#"
cooldown_ms: 1000
spam_notice: "Slow down!"
detection:
  replacement: '*'
  layers:
    statistical:
      enabled: false
install:
  use_cwd_for_extra: true
"#,
        )
        .unwrap();

        let config = BreezeConfig::load(&path).unwrap();
        assert_eq!(config.cooldown_ms, 1000);
        assert_eq!(config.spam_notice, "Slow down!");
        assert_eq!(config.detection.replacement, '*');
        assert!(!config.detection.layers.statistical.enabled);
        assert!(config.detection.layers.longlist.enabled);
        assert!(config.install.use_cwd_for_extra);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breeze.yaml");
        std::fs::write(&path, "cooldown_ms: [not, a, number]").unwrap();

        assert!(matches!(
            BreezeConfig::load(&path),
            Err(breeze_core::Error::Config(_))
        ));
    }
}
