//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use accrue_engine::EngineConfig;
use accrue_llm::openai::{
    DASHSCOPE_CN_BASE_URL, DASHSCOPE_INTL_BASE_URL, DEEPSEEK_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT_SECS, OPENAI_BASE_URL,
};
use accrue_llm::ProviderSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Extraction and matching settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Output settings
    #[serde(default)]
    pub settings: Settings,
}

/// Model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Endpoint base URL, or one of `openai`, `deepseek`, `dashscope-intl`,
    /// `dashscope-cn`
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key; empty for no key
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token budget (model default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Attempts per request
    pub max_retries: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".accrue").join("config.toml"))
    }

    /// Load configuration from `path` (or the default path), falling back to
    /// defaults when the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let config: Config = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };

        config.engine.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl ProviderConfig {
    /// Base URL with presets expanded.
    pub fn resolved_base_url(&self) -> &str {
        match self.base_url.to_ascii_lowercase().as_str() {
            "openai" => OPENAI_BASE_URL,
            "deepseek" => DEEPSEEK_BASE_URL,
            "dashscope-intl" => DASHSCOPE_INTL_BASE_URL,
            "dashscope-cn" => DASHSCOPE_CN_BASE_URL,
            _ => &self.base_url,
        }
    }

    /// Provider settings, reading the API key from the environment.
    pub fn to_settings(&self) -> Result<ProviderSettings> {
        if self.model.trim().is_empty() {
            return Err(CliError::Config("provider.model must not be empty".into()));
        }

        let api_key = if self.api_key_env.is_empty() {
            String::new()
        } else {
            std::env::var(&self.api_key_env).map_err(|_| {
                CliError::Config(format!("Environment variable {} is not set", self.api_key_env))
            })?
        };

        Ok(ProviderSettings {
            api_key,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            timeout: Duration::from_secs(self.timeout_secs),
            ..ProviderSettings::new(self.resolved_base_url(), self.model.clone())
        })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_engine::BatchOrder;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.resolved_base_url(), OPENAI_BASE_URL);
        assert_eq!(config.engine.language, "English");
        assert!(config.settings.color);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [provider]
            base_url = "deepseek"
            model = "deepseek-chat"
            api_key_env = ""

            [engine]
            language = "German"
            batch_order = "submission"

            [settings]
            format = "json"
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.provider.resolved_base_url(), DEEPSEEK_BASE_URL);
        assert_eq!(config.provider.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.engine.language, "German");
        assert_eq!(config.engine.batch_order, BatchOrder::Submission);
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert!(config.settings.color);

        let settings = config.provider.to_settings().unwrap();
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.model, "deepseek-chat");
    }

    #[test]
    fn test_invalid_engine_section_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nmax_concurrency = 0\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(CliError::Config(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[provider\nmodel = ").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.provider.max_tokens = Some(4096);
        config.save(&path).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.provider.max_tokens, Some(4096));
        assert_eq!(reloaded.engine, config.engine);
    }

    #[test]
    fn test_missing_api_key_env() {
        let provider = ProviderConfig {
            api_key_env: "ACCRUE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ProviderConfig::default()
        };
        assert!(matches!(provider.to_settings(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_custom_base_url_kept() {
        let provider = ProviderConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.resolved_base_url(), "http://localhost:11434/v1");
    }
}
