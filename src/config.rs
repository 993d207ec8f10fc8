//! Configuration management for procassist
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::api::HistoryLimit;
use crate::error::{ProcassistError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for procassist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Interactive chat settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Defaults for the history command
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API gateway, without the stage segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deployment stage appended to the base URL
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("procassist/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stage: default_stage(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Print the welcome notice when a chat session starts
    #[serde(default = "default_true")]
    pub show_welcome: bool,

    /// Prefix rendered messages with their local time
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            show_welcome: true,
            show_timestamps: true,
        }
    }
}

/// History command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of records requested when `--limit` is omitted (5, 10 or 20)
    #[serde(default = "default_history_limit")]
    pub default_limit: u32,
}

fn default_history_limit() -> u32 {
    HistoryLimit::default().as_u32()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI overrides
    ///
    /// A missing file is not an error: built-in defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line, for `--base-url` and `--stage` overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProcassistError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string
    ///
    /// # Examples
    ///
    /// ```
    /// use procassist::config::Config;
    ///
    /// let config = Config::from_yaml("api:\n  stage: prod\n").unwrap();
    /// assert_eq!(config.api.stage, "prod");
    /// assert_eq!(config.api.timeout_seconds, 30);
    /// ```
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| ProcassistError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("PROCASSIST_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: PROCASSIST_BASE_URL");
            self.api.base_url = base_url;
        }

        if let Ok(stage) = std::env::var("PROCASSIST_STAGE") {
            tracing::debug!(stage = %stage, "Env override: PROCASSIST_STAGE");
            self.api.stage = stage;
        }

        if let Ok(timeout) = std::env::var("PROCASSIST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid PROCASSIST_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.api.base_url = base_url.clone();
        }

        if let Some(stage) = &cli.stage {
            self.api.stage = stage.clone();
        }

        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Full endpoint prefix: `{base_url}/{stage}`
    ///
    /// # Examples
    ///
    /// ```
    /// use procassist::config::Config;
    ///
    /// let mut config = Config::default();
    /// config.api.base_url = "https://api.example.com/".to_string();
    /// assert_eq!(config.endpoint_base(), "https://api.example.com/dev");
    /// ```
    pub fn endpoint_base(&self) -> String {
        format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            self.api.stage.trim_matches('/')
        )
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| {
            ProcassistError::Config(format!(
                "Invalid api.base_url '{}': {}",
                self.api.base_url, e
            ))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProcassistError::Config(format!(
                "api.base_url must use http or https, got {}",
                parsed.scheme()
            ))
            .into());
        }

        let stage = self.api.stage.trim();
        if stage.is_empty() {
            return Err(ProcassistError::Config("api.stage cannot be empty".to_string()).into());
        }

        if stage.contains('/') {
            return Err(ProcassistError::Config(format!(
                "api.stage must be a single path segment, got {}",
                stage
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(ProcassistError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.api.timeout_seconds > 300 {
            return Err(ProcassistError::Config(
                "api.timeout_seconds must be less than or equal to 300".to_string(),
            )
            .into());
        }

        HistoryLimit::try_from(self.history.default_limit).map_err(|e| {
            ProcassistError::Config(format!("history.default_limit: {}", e))
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use serial_test::serial;
    use std::env;

    fn cli_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("cli parse failed")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.stage, "dev");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.history.default_limit, 5);
        assert!(config.chat.show_welcome);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_http_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_config_validation_empty_stage() {
        let mut config = Config::default();
        config.api.stage = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_stage_with_slash() {
        let mut config = Config::default();
        config.api.stage = "dev/v2".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timeout_bounds() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.api.timeout_seconds = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_history_limit() {
        let mut config = Config::default();
        config.history.default_limit = 7;
        assert!(config.validate().is_err());

        config.history.default_limit = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_base_trims_slashes() {
        let mut config = Config::default();
        config.api.base_url = "https://api.example.com///".to_string();
        config.api.stage = "/prod/".to_string();
        assert_eq!(config.endpoint_base(), "https://api.example.com/prod");
    }

    #[test]
    fn test_from_yaml_partial_sections() {
        let yaml = r#"
api:
  base_url: https://abc.execute-api.us-east-1.amazonaws.com
chat:
  show_timestamps: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.api.base_url,
            "https://abc.execute-api.us-east-1.amazonaws.com"
        );
        assert_eq!(config.api.stage, "dev");
        assert!(!config.chat.show_timestamps);
        assert!(config.chat.show_welcome);
    }

    #[test]
    fn test_from_yaml_invalid() {
        assert!(Config::from_yaml("api: [not, a, map]").is_err());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = cli_from(&["procassist", "chat"]);
        let config = Config::load("/nonexistent/procassist.yaml", &cli).unwrap();
        assert_eq!(config.api.stage, "dev");
        assert!(matches!(cli.command, Commands::Chat));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("PROCASSIST_BASE_URL", "https://env.example.com");
        env::set_var("PROCASSIST_STAGE", "staging");
        env::set_var("PROCASSIST_TIMEOUT_SECONDS", "12");

        let cli = cli_from(&["procassist", "chat"]);
        let config = Config::load("/nonexistent/procassist.yaml", &cli).unwrap();

        env::remove_var("PROCASSIST_BASE_URL");
        env::remove_var("PROCASSIST_STAGE");
        env::remove_var("PROCASSIST_TIMEOUT_SECONDS");

        assert_eq!(config.api.base_url, "https://env.example.com");
        assert_eq!(config.api.stage, "staging");
        assert_eq!(config.api.timeout_seconds, 12);
    }

    #[test]
    #[serial]
    fn test_invalid_env_timeout_is_ignored() {
        env::set_var("PROCASSIST_TIMEOUT_SECONDS", "soon");
        let cli = cli_from(&["procassist", "chat"]);
        let config = Config::load("/nonexistent/procassist.yaml", &cli).unwrap();
        env::remove_var("PROCASSIST_TIMEOUT_SECONDS");

        assert_eq!(config.api.timeout_seconds, 30);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_env() {
        env::set_var("PROCASSIST_STAGE", "staging");
        let cli = cli_from(&[
            "procassist",
            "--base-url",
            "https://cli.example.com",
            "--stage",
            "prod",
            "chat",
        ]);
        let config = Config::load("/nonexistent/procassist.yaml", &cli).unwrap();
        env::remove_var("PROCASSIST_STAGE");

        assert_eq!(config.api.base_url, "https://cli.example.com");
        assert_eq!(config.api.stage, "prod");
    }
}
