//! Service configuration loaded from the environment (and `.env`).

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Lowest and highest work factors bcrypt accepts
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Bounds on the random bytes per token
pub const MIN_TOKEN_BYTES: usize = 16;
pub const MAX_TOKEN_BYTES: usize = 256;

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime configuration for the auth service
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Lifetime of an issued session token
    pub token_ttl: Duration,

    /// Number of random bytes per token (hex encoded, so twice as many chars)
    pub token_bytes: usize,

    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,

    /// How often expired sessions are purged
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            token_ttl: Duration::from_secs(24 * 60 * 60),
            token_bytes: 32,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let host = env::var("AUTH_HOST").unwrap_or(defaults.host);
        let port = parse_var("PORT", defaults.port)?;
        let token_ttl = parse_var("AUTH_TOKEN_TTL_SECS", defaults.token_ttl.as_secs())?;
        let token_bytes = parse_var("AUTH_TOKEN_BYTES", defaults.token_bytes)?;
        let bcrypt_cost = parse_var("AUTH_BCRYPT_COST", defaults.bcrypt_cost)?;
        let sweep_interval =
            parse_var("AUTH_SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs())?;

        let config = Self {
            host,
            port,
            token_ttl: Duration::from_secs(token_ttl),
            token_bytes,
            bcrypt_cost,
            sweep_interval: Duration::from_secs(sweep_interval),
        };
        config.validate()?;
        Ok(config)
    }

    /// Socket address string for `HttpServer::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TOKEN_BYTES..=MAX_TOKEN_BYTES).contains(&self.token_bytes) {
            return Err(ConfigError::InvalidValue {
                name: "AUTH_TOKEN_BYTES",
                value: self.token_bytes.to_string(),
            });
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue {
                name: "AUTH_BCRYPT_COST",
                value: self.bcrypt_cost.to_string(),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "AUTH_SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
