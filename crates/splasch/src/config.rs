//! Settings loaded from a TOML file layered with `SPLASCH__*` variables

use alerting::PushbulletConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use search::{PollConfig, SplunkConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `SPLASCH__SPLUNK__PASSWORD`
const ENV_PREFIX: &str = "SPLASCH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub splunk: SplunkConfig,
    pub pushbullet: PushbulletConfig,
    /// Web UI base URL drilldown links point to
    pub alert_link: String,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "splasch.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append log lines here instead of stdout
    pub file: Option<PathBuf>,
    pub debug: bool,
}

impl Settings {
    /// Load settings from `path` (optional file) and the environment
    pub fn load(path: &Path) -> Result<Self> {
        let source = path
            .to_str()
            .with_context(|| format!("Invalid config path: {}", path.display()))?;

        Self::from_builder(
            Config::builder().add_source(File::new(source, FileFormat::Toml).required(false)),
        )
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Parse settings from TOML text, still honouring the environment
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.database.path, "splasch.db");
        assert_eq!(settings.splunk.port, 8089);
        assert_eq!(settings.splunk.scheme, "https");
        assert_eq!(settings.pushbullet.base_url, "https://api.pushbullet.com");
        assert_eq!(settings.poll.initial_delay_ms, 250);
        assert_eq!(settings.poll.timeout_secs, 600);
        assert!(!settings.logging.debug);
        assert!(settings.logging.file.is_none());
    }

    #[test]
    fn test_file_values() {
        let settings = Settings::from_toml(
            r#"
            alert_link = "https://splunk.example.com:8000"

            [splunk]
            host = "splunk.example.com"
            password = "changeme"
            app = "security"

            [pushbullet]
            api_key = "o.abc"

            [database]
            path = "/var/lib/splasch/suppress.db"

            [logging]
            file = "/var/log/splasch.log"
            debug = true

            [poll]
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(settings.alert_link, "https://splunk.example.com:8000");
        assert_eq!(settings.splunk.host, "splunk.example.com");
        assert_eq!(settings.splunk.app.as_deref(), Some("security"));
        assert_eq!(settings.splunk.port, 8089);
        assert_eq!(settings.pushbullet.api_key, "o.abc");
        assert_eq!(settings.database.path, "/var/lib/splasch/suppress.db");
        assert_eq!(
            settings.logging.file.as_deref(),
            Some(Path::new("/var/log/splasch.log"))
        );
        assert!(settings.logging.debug);
        assert_eq!(settings.poll.timeout_secs, 30);
        assert_eq!(settings.poll.max_delay_ms, 5000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/splasch.toml")).unwrap();
        assert_eq!(settings.database.path, "splasch.db");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(Settings::from_toml("[splunk\nhost = ").is_err());
    }
}
