//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The primary login credential is supplied through HUNTER_EMAIL /
//! HUNTER_PASSWORD, never stored in the TOML, to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub claim: ClaimConfig,
    #[serde(skip)]
    pub primary: Option<PrimaryCredential>,
}

/// Remote service settings
#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

/// Loop pacing. The cycle delay must be non-zero so an idle bot cannot
/// spin against the gateway.
#[derive(Debug, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_cycle_delay_ms")]
    pub cycle_delay_ms: u64,
    #[serde(default = "default_target_delay_secs")]
    pub target_delay_secs: u64,
    #[serde(default = "default_lookup_cooldown_secs")]
    pub lookup_cooldown_secs: u64,
}

/// Claim routing settings
#[derive(Debug, Default, Deserialize)]
pub struct ClaimConfig {
    /// Nickname the reserved (index 0) entertainer credential is held for
    #[serde(default)]
    pub priority_nickname: Option<String>,
}

/// The bot's own login, read from the environment at load time.
#[derive(Debug)]
pub struct PrimaryCredential {
    pub email: String,
    pub password: Secret<String>,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_cycle_delay_ms() -> u64 {
    500
}

fn default_target_delay_secs() -> u64 {
    2
}

fn default_lookup_cooldown_secs() -> u64 {
    10
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            cycle_delay_ms: default_cycle_delay_ms(),
            target_delay_secs: default_target_delay_secs(),
            lookup_cooldown_secs: default_lookup_cooldown_secs(),
        }
    }
}

impl PacingConfig {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn target_delay(&self) -> Duration {
        Duration::from_secs(self.target_delay_secs)
    }

    pub fn lookup_cooldown(&self) -> Duration {
        Duration::from_secs(self.lookup_cooldown_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// The primary credential is taken from HUNTER_EMAIL + HUNTER_PASSWORD;
    /// setting only one of the pair is a configuration error.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        // Validate base_url is a valid URL with http(s) scheme
        if !config.service.base_url.starts_with("http://")
            && !config.service.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.service.base_url
            )));
        }

        // Validate cycle_delay_ms is non-zero
        if config.pacing.cycle_delay_ms == 0 {
            return Err(common::Error::Config(
                "cycle_delay_ms must be greater than 0".into(),
            ));
        }

        // Resolve the primary credential pair
        match (
            std::env::var("HUNTER_EMAIL"),
            std::env::var("HUNTER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => {
                if email.is_empty() {
                    return Err(common::Error::Config("HUNTER_EMAIL is empty".into()));
                }
                config.primary = Some(PrimaryCredential {
                    email,
                    password: Secret::new(password),
                });
            }
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                return Err(common::Error::Config(
                    "HUNTER_EMAIL and HUNTER_PASSWORD must be set together".into(),
                ));
            }
            (Err(_), Err(_)) => {}
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("nickname-hunter.toml")
    }
}
