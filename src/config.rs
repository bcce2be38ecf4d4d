use crate::error::ConfigError;
use crate::models::Mode;
use log::info;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub server_url: String,
    pub item_count: u32,
    pub default_mode: Mode,
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub profile_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let poll_ms: u64 = try_load(&lookup, "POLL_INTERVAL_MS", "1000")?;
        let debounce_ms: u64 = try_load(&lookup, "DEBOUNCE_MS", "500")?;

        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                value: poll_ms.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite:live_tally.db")?,
            port: try_load(&lookup, "PORT", "3000")?,
            server_url: try_load(&lookup, "SERVER_URL", "http://127.0.0.1:3000")?,
            item_count: try_load(&lookup, "ITEM_COUNT", "9")?,
            default_mode: try_load(&lookup, "DEFAULT_MODE", "multiple")?,
            poll_interval: Duration::from_millis(poll_ms),
            debounce: Duration::from_millis(debounce_ms),
            profile_path: try_load(&lookup, "PROFILE_PATH", ".live_tally_profile.json")?,
        })
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
