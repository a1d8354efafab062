//! User configuration
//!
//! Read from `~/.scriptpilot/config.toml`, which is created with defaults the
//! first time it is missing. Environment variables and CLI flags are layered
//! on top.

use scriptpilot_agent::{LoopConfig, SessionConfig};
use scriptpilot_error::{Error, Result};
use scriptpilot_llm::{ProviderConfig, ProviderType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = ".scriptpilot";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_FILE: &str = "history";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `openai`, `anthropic` or `local`
    pub provider: ProviderType,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub timeout_secs: u64,
    /// Interpreter used to run scripts
    pub python: String,
    /// Show every script and ask before running it
    pub dry_run: bool,
    /// Save every proposed script under `~/.scriptpilot/scripts`
    pub archive_scripts: bool,
    /// File this config was read from
    #[serde(skip)]
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAI,
            model: None,
            base_url: None,
            api_key: None,
            temperature: Some(1.0),
            max_tokens: Some(4096),
            timeout_secs: 120,
            python: "python3".into(),
            dry_run: false,
            archive_scripts: true,
            path: default_path(),
        }
    }
}

/// `~/.scriptpilot`, or `./.scriptpilot` without a home directory.
pub fn app_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

pub fn default_path() -> PathBuf {
    app_dir().join(CONFIG_FILE)
}

/// Interactive requests, one per line.
pub fn history_path() -> PathBuf {
    app_dir().join(HISTORY_FILE)
}

impl Config {
    /// Load `path`, writing the defaults there first when it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self {
                path: path.to_path_buf(),
                ..Self::default()
            };
            config.save(path)?;
            tracing::info!(path = %path.display(), "created default config");
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, path: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(raw).map_err(|e| {
            Error::config_invalid(path.display().to_string(), e.message())
                .with_operation("config::parse")
                .set_source(e)
        })?;
        config.path = path.to_path_buf();
        config.validate(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| {
            Error::unexpected("cannot serialize config")
                .with_operation("config::save")
                .set_source(e)
        })?;

        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, raw)
        };
        write().map_err(|e| {
            Error::from(e)
                .with_operation("config::save")
                .with_context("path", path.display().to_string())
        })
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Error::config_invalid(
                    path.display().to_string(),
                    format!("temperature must be between 0 and 2, got {}", temperature),
                ));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(Error::config_invalid(path.display().to_string(), "max_tokens must be positive"));
        }
        if self.python.trim().is_empty() {
            return Err(Error::config_invalid(path.display().to_string(), "python must name an interpreter"));
        }
        if self.provider == ProviderType::Local && self.base_url.is_none() {
            return Err(Error::config_invalid(
                path.display().to_string(),
                "the local provider needs a base_url",
            ));
        }
        Ok(())
    }

    /// Layer environment variables on top of the file.
    ///
    /// `SCRIPTPILOT_API_KEY` and `SCRIPTPILOT_MODEL` win over the file. The
    /// vendor variable (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`) is only used
    /// when no key is configured at all.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("SCRIPTPILOT_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            let vendor = match self.provider {
                ProviderType::OpenAI => Some("OPENAI_API_KEY"),
                ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
                ProviderType::Local => None,
            };
            self.api_key = vendor.and_then(non_empty);
        }

        if let Some(model) = non_empty("SCRIPTPILOT_MODEL") {
            self.model = Some(model);
        }
    }

    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let api_key = || {
            self.api_key.clone().ok_or_else(|| {
                Error::config_invalid(
                    self.path.display().to_string(),
                    "no API key; set api_key or SCRIPTPILOT_API_KEY",
                )
                .with_operation("config::provider_config")
            })
        };

        let mut config = match self.provider {
            ProviderType::OpenAI => ProviderConfig::openai(api_key()?),
            ProviderType::Anthropic => ProviderConfig::anthropic(api_key()?),
            ProviderType::Local => {
                let base_url = self.base_url.clone().unwrap_or_default();
                let model = self.model.clone().ok_or_else(|| {
                    Error::config_invalid(
                        self.path.display().to_string(),
                        "the local provider needs a model; set model or pass --model",
                    )
                    .with_operation("config::provider_config")
                })?;
                let mut config = ProviderConfig::local(base_url, model);
                config.api_key = self.api_key.clone();
                config
            }
        };

        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        Ok(config.with_timeout(self.timeout_secs))
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            verbose: self.dry_run,
            session: SessionConfig {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
        }
    }
}
