use std::{env, fmt::Display, str::FromStr};

use crate::constants::{DEV_SECRET, MAX_TOKEN_TTL_HOURS};

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub secret: String,
    pub token_ttl_hours: i64,
    pub media_root: String,
    pub media_url: String,
    pub db_max_connections: u32,
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.info)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let database_url = var("DATABASE_URL").ok_or_else(|| ConfigError {
            info: "DATABASE_URL must be set".to_string(),
        })?;

        let secret = var("COOKBOOK_SECRET").unwrap_or_else(|| {
            log::warn!("COOKBOOK_SECRET not set, using the development secret");
            DEV_SECRET.to_string()
        });

        Ok(Self {
            database_url,
            host: try_load("COOKBOOK_HOST", "0.0.0.0")?,
            port: try_load("COOKBOOK_PORT", "8000")?,
            secret,
            token_ttl_hours: token_ttl(try_load("COOKBOOK_TOKEN_TTL_HOURS", "24")?)?,
            media_root: try_load("COOKBOOK_MEDIA_ROOT", "media")?,
            media_url: try_load("COOKBOOK_MEDIA_URL", "/media")?,
            db_max_connections: try_load("COOKBOOK_DB_MAX_CONNECTIONS", "10")?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn token_ttl(hours: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Ok(hours);
    }
    Err(ConfigError {
        info: format!("COOKBOOK_TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
    })
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    parse(key, var(key), default)
}

fn parse<T: FromStr>(key: &str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| ConfigError {
            info: format!("Invalid {key} value: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_fall_back_to_default() {
        let port: u16 = parse("COOKBOOK_PORT", None, "8000").unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn set_values_win_and_are_parsed() {
        let ttl: i64 = parse("COOKBOOK_TOKEN_TTL_HOURS", Some("48".to_string()), "24").unwrap();
        assert_eq!(ttl, 48);

        let error = parse::<u16>("COOKBOOK_PORT", Some("eighty".to_string()), "8000").unwrap_err();
        assert!(error.to_string().contains("COOKBOOK_PORT"));
    }

    #[test]
    fn token_lifetime_is_bounded() {
        assert_eq!(token_ttl(24).unwrap(), 24);
        assert!(token_ttl(0).is_err());
        assert!(token_ttl(i64::MAX).is_err());
    }
}
