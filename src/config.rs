//! Configuration Management
//!
//! Persistent configuration for hcfleet, read from
//! `<config dir>/hcfleet/config.json`. Command-line flags (and the
//! environment variables backing them) override the file.

use crate::error::{Error, Result};
use crate::hcloud::client::DEFAULT_API_URL;
use crate::pricing::Tier;
use crate::snapshot::SnapshotOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable backing `--token`
pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";
/// Environment variable backing `--endpoint`
pub const ENDPOINT_ENV: &str = "HCLOUD_ENDPOINT";

/// Snapshot defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub description_prefix: String,
    pub force: bool,
    pub labels: BTreeMap<String, String>,
    pub concurrency: usize,
    pub poll_interval_ms: u64,
    /// 0 waits without limit
    pub max_wait_secs: u64,
    pub max_polls: Option<u32>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            description_prefix: "snapshot-".to_string(),
            force: false,
            labels: BTreeMap::new(),
            concurrency: 4,
            poll_interval_ms: 2000,
            max_wait_secs: 600,
            max_polls: None,
        }
    }
}

impl SnapshotConfig {
    /// Options for a run; `dry_run` and `wait` are decided per invocation
    pub fn to_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            description_prefix: self.description_prefix.clone(),
            force: self.force,
            labels: self.labels.clone(),
            dry_run: false,
            wait: false,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs)),
            max_polls: self.max_polls,
            concurrency: self.concurrency.max(1),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API token; `--token` / `HCLOUD_TOKEN` takes precedence
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub page_size: u32,
    pub tier: Tier,
    pub snapshot: SnapshotConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_url: None,
            page_size: 50,
            tier: Tier::Net,
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hcfleet").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Get effective token (command line > config)
    pub fn effective_token(&self, from_cli: Option<String>) -> Result<String> {
        Self::pick_token(from_cli, self.token.clone())
    }

    fn pick_token(from_cli: Option<String>, from_config: Option<String>) -> Result<String> {
        from_cli
            .filter(|t| !t.trim().is_empty())
            .or(from_config.filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "No API token found. Pass --token, set {} or add \"token\" to the config file",
                    TOKEN_ENV
                ))
            })
    }

    /// Get effective API endpoint (command line > config > default)
    pub fn effective_api_url(&self, from_cli: Option<String>) -> String {
        from_cli
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.api_url.clone().filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"tier": "gross", "snapshot": {"description_prefix": "weekly-", "max_wait_secs": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.tier, Tier::Gross);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.snapshot.concurrency, 4);

        let options = config.snapshot.to_options();
        assert_eq!(options.description_prefix, "weekly-");
        assert_eq!(options.max_wait, None);
        assert_eq!(options.poll_interval, Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_concurrency_is_raised_to_one() {
        let config = SnapshotConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.to_options().concurrency, 1);
    }

    #[test]
    fn test_token_precedence() {
        assert_eq!(
            Config::pick_token(Some("env".into()), Some("file".into())).unwrap(),
            "env"
        );
        assert_eq!(
            Config::pick_token(Some(" ".into()), Some("file".into())).unwrap(),
            "file"
        );
        assert!(matches!(
            Config::pick_token(None, None),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_endpoint_precedence() {
        let config = Config {
            api_url: Some("https://file.example.test/v1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.effective_api_url(Some("http://127.0.0.1:4000/v1".to_string())),
            "http://127.0.0.1:4000/v1"
        );
        assert_eq!(config.effective_api_url(Some(String::new())), "https://file.example.test/v1");
        assert_eq!(Config::default().effective_api_url(None), DEFAULT_API_URL);
    }

    #[test]
    fn test_missing_or_invalid_file_gives_defaults() {
        let dir = std::env::temp_dir().join(format!("hcfleet-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = Config::load_from(&dir.join("absent.json"));
        assert_eq!(missing.page_size, 50);

        let invalid = dir.join("invalid.json");
        std::fs::write(&invalid, "{ not json").unwrap();
        assert!(Config::load_from(&invalid).token.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
