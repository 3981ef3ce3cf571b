use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;

use crate::schema;

const DEFAULT_MONGO_URL: &str = "mongodb://localhost:27017";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub(crate) struct ConfigError {
    key: &'static str,
    value: String,
    reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub mongo_url: String,
    pub mongo_database: String,
    pub redis_url: Option<String>,
    pub store_timeout: Duration,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "4000")?,
            store_backend: try_load("STORE_BACKEND", "mongo")?,
            mongo_url: try_load("MONGO_URL", DEFAULT_MONGO_URL)?,
            mongo_database: try_load("MONGO_DATABASE", schema::DATABASE)?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            store_timeout: Duration::from_secs(try_load("STORE_TIMEOUT_SECS", "5")?),
            bcrypt_cost: try_load("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?,
            cors_origins: parse_origins(&try_load::<String>(
                "CORS_ORIGINS",
                DEFAULT_CORS_ORIGINS,
            )?),
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        });

    value.parse().map_err(|e: T::Err| ConfigError {
        key,
        reason: e.to_string(),
        value,
    })
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
