//! Configuration loading and resolution
//!
//! Settings are resolved once at startup with this priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! Command-line and environment values arrive together as [`ConfigOverrides`]
//! (the binary's argument parser reads both). The result is an immutable
//! [`RelayConfig`] handed to every component that talks to an upstream.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind host (loopback only)
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Largest accepted schedule image (5 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Default timeout applied to every upstream request
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; anything missing falls through to the
/// built-in default or must be supplied on the command line/environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,

    #[serde(default)]
    pub workforce: WorkforceSection,

    #[serde(default)]
    pub gemini: GeminiSection,

    #[serde(default)]
    pub shift_defaults: ShiftDefaultsSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[workforce]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkforceSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// `[gemini]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// `[shift_defaults]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftDefaultsSection {
    pub mealbreak_minutes: Option<u32>,
    pub opunit_id: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workforce_url: Option<String>,
    pub workforce_token: Option<String>,
    pub gemini_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
}

/// Workforce API connection settings
#[derive(Clone)]
pub struct WorkforceConfig {
    /// Base URL without trailing slash, e.g. `https://acme.as.deputy.com/api/v1`
    pub base_url: String,
    /// Bearer token
    pub token: String,
}

impl fmt::Debug for WorkforceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkforceConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Generative model connection settings
#[derive(Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Values substituted when an extracted shift omits a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftDefaults {
    pub mealbreak_minutes: u32,
    pub opunit_id: u64,
}

impl Default for ShiftDefaults {
    fn default() -> Self {
        Self {
            mealbreak_minutes: 30,
            opunit_id: 1,
        }
    }
}

/// Fully resolved, immutable service configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub workforce: WorkforceConfig,
    pub gemini: GeminiConfig,
    pub max_upload_bytes: usize,
    pub upstream_timeout: Duration,
    pub shift_defaults: ShiftDefaults,
    pub log_level: String,
}

impl RelayConfig {
    /// Merge overrides and TOML into a validated configuration
    ///
    /// Every missing required key is reported in a single
    /// [`Error::Config`] so an operator can fix them all at once.
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Result<Self> {
        let mut missing = Vec::new();

        let workforce_url = overrides.workforce_url.or(toml.workforce.base_url);
        let workforce_token = non_blank(overrides.workforce_token.or(toml.workforce.token));
        let gemini_api_key = non_blank(overrides.gemini_api_key.or(toml.gemini.api_key));

        if non_blank(workforce_url.clone()).is_none() {
            missing.push("WORKFORCE_API_URL (--workforce-url / [workforce] base_url)");
        }
        if workforce_token.is_none() {
            missing.push("WORKFORCE_API_TOKEN (--workforce-token / [workforce] token)");
        }
        if gemini_api_key.is_none() {
            missing.push("GEMINI_API_KEY (--gemini-api-key / [gemini] api_key)");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let workforce = WorkforceConfig {
            base_url: normalize_base_url(&workforce_url.unwrap_or_default())?,
            token: workforce_token.unwrap_or_default(),
        };

        let gemini = GeminiConfig {
            base_url: normalize_base_url(
                &overrides
                    .gemini_url
                    .or(toml.gemini.base_url)
                    .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            )?,
            api_key: gemini_api_key.unwrap_or_default(),
            model: non_blank(overrides.gemini_model.or(toml.gemini.model))
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        };

        let max_upload_bytes = toml.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be greater than zero".to_string()));
        }

        let defaults = ShiftDefaults::default();
        let config = Self {
            host: overrides
                .host
                .or(toml.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            workforce,
            gemini,
            max_upload_bytes,
            upstream_timeout: Duration::from_secs(
                toml.upstream_timeout_secs
                    .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            ),
            shift_defaults: ShiftDefaults {
                mealbreak_minutes: toml
                    .shift_defaults
                    .mealbreak_minutes
                    .unwrap_or(defaults.mealbreak_minutes),
                opunit_id: toml.shift_defaults.opunit_id.unwrap_or(defaults.opunit_id),
            },
            log_level: toml.logging.level,
        };

        debug!(?config, "Configuration resolved");
        Ok(config)
    }

    /// `host:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load the TOML config file
///
/// An explicitly named file must exist. Without one, the per-user default
/// (`<config_dir>/shiftrelay/config.toml`) is used when present, otherwise
/// an empty configuration is returned.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using environment and defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Per-user config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shiftrelay").join("config.toml"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "base URL must start with http:// or https://: {}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}
