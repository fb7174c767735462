//! Environment-driven configuration structures shared by all binaries.

use std::env;

use thiserror::Error;

const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INVITE_TTL_SECS: i64 = 86_400;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Telegram transport knobs shared by the API and sweeper binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    bot_token: String,
    channel_id: i64,
    notify_timeout_secs: u64,
    invite_ttl_secs: i64,
}

impl BotConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let channel_id = get_required_var("CHANNEL_ID")?
            .parse()
            .map_err(|source| ConfigError::InvalidNumber {
                key: "CHANNEL_ID",
                source,
            })?;

        Ok(Self {
            bot_token: get_required_var("BOT_TOKEN")?,
            channel_id,
            notify_timeout_secs: parse_optional_var(
                "NOTIFY_TIMEOUT_SECS",
                DEFAULT_NOTIFY_TIMEOUT_SECS,
            )?,
            invite_ttl_secs: parse_optional_var("INVITE_TTL_SECS", DEFAULT_INVITE_TTL_SECS)?,
        })
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn channel_id(&self) -> i64 {
        self.channel_id
    }

    pub fn notify_timeout_secs(&self) -> u64 {
        self.notify_timeout_secs
    }

    pub fn invite_ttl_secs(&self) -> i64 {
        self.invite_ttl_secs
    }
}

/// API-specific configuration (HTTP bind + shared database + bot transport)
/// so the HTTP surface does not depend on sweeper-only environment
/// variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    database_url: String,
    api_bind_address: String,
    bot: BotConfig,
}

impl ApiConfig {
    /// Loads only the environment variables required by the API binary.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            database_url: get_required_var("DATABASE_URL")?,
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
            bot: BotConfig::load_from_env()?,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    pub fn bot(&self) -> &BotConfig {
        &self.bot
    }
}

/// Configuration for the expiry sweeper binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    database_url: String,
    sweep_interval_secs: u64,
    bot: BotConfig,
}

impl SweeperConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            database_url: get_required_var("DATABASE_URL")?,
            sweep_interval_secs: parse_optional_var(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
            bot: BotConfig::load_from_env()?,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn sweep_interval_secs(&self) -> u64 {
        self.sweep_interval_secs
    }

    pub fn bot(&self) -> &BotConfig {
        &self.bot
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingVar { key })
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingVar { key }),
    }
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_optional_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match get_optional_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|source| ConfigError::InvalidNumber { key, source }),
        None => Ok(default),
    }
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("SUBGATE_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
