//! Client configuration for Scrawl.
//!
//! TOML file + `SCRAWL_`-prefixed environment variables via figment,
//! credential resolution (env + keyring + plaintext), and translation to
//! `scrawl_api::ClientConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use scrawl_api::{ClientConfig, Credentials};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured")]
    NoCredentials,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config struct ──────────────────────────────────────────────

/// Top-level configuration for a Scrawl client.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Server root URL.
    #[serde(default = "default_server")]
    pub server: String,

    /// Preferred UI locale (must be one of `locales`).
    pub locale: Option<String>,

    /// Locales the route layer recognizes as path prefixes.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed certificates (self-hosted servers).
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Account username.
    pub username: Option<String>,

    /// Account password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Ask the server for a long-lived session on login.
    #[serde(default)]
    pub remember_me: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            locale: None,
            locales: default_locales(),
            timeout: default_timeout(),
            accept_invalid_certs: false,
            username: None,
            password: None,
            remember_me: false,
        }
    }
}

fn default_server() -> String {
    "http://localhost:8080".into()
}
fn default_locales() -> Vec<String> {
    vec!["en".into()]
}
fn default_timeout() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "scrawl", "scrawl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("scrawl");
    p
}

// ── Config loading / saving ─────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load a Config from a specific file + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SCRAWL_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning defaults if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve login credentials from the chain: env var, system keyring,
/// plaintext config.
pub fn resolve_credentials(cfg: &Config) -> Result<Credentials, ConfigError> {
    let username = cfg
        .username
        .clone()
        .or_else(|| std::env::var("SCRAWL_USERNAME").ok())
        .ok_or(ConfigError::NoCredentials)?;

    // 1. Env var
    if let Ok(pw) = std::env::var("SCRAWL_PASSWORD") {
        return Ok(Credentials {
            username,
            password: SecretString::from(pw),
            remember_me: cfg.remember_me,
        });
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new("scrawl", &format!("{username}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(Credentials {
                username,
                password: SecretString::from(pw),
                remember_me: cfg.remember_me,
            });
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = cfg.password {
        return Ok(Credentials {
            username,
            password: SecretString::from(pw.clone()),
            remember_me: cfg.remember_me,
        });
    }

    Err(ConfigError::NoCredentials)
}

// ── Translation to the API layer ────────────────────────────────────

/// Build a `ClientConfig` from the loaded configuration.
pub fn to_client_config(cfg: &Config) -> Result<ClientConfig, ConfigError> {
    let base_url: url::Url = cfg.server.parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {}", cfg.server),
    })?;

    let mut client = ClientConfig::new(base_url);
    client.timeout = Duration::from_secs(cfg.timeout);
    client.accept_invalid_certs = cfg.accept_invalid_certs;
    Ok(client)
}

/// The locale to prefix routes with, validated against `locales`.
pub fn active_locale(cfg: &Config) -> Option<&str> {
    cfg.locale
        .as_deref()
        .filter(|l| cfg.locales.iter().any(|known| known == l))
}
