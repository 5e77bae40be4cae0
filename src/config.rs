//! Environment-driven configuration.

use std::env;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "opensase-storefront-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` runs the service on in-memory storage.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    pub image_root: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub base_url: String,
    pub secret_key: String,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("DATABASE_URL").filter(|v| !v.is_empty());
        let secret = match (get("JWT_SECRET"), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => return Err(ConfigError::Missing("JWT_SECRET")),
            (None, None) => DEV_JWT_SECRET.to_string(),
        };

        Ok(Self {
            port: parse(&get, "PORT", 8083)?,
            database_max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            database_url,
            nats_url: get("NATS_URL").filter(|v| !v.is_empty()),
            jwt: JwtConfig {
                secret,
                issuer: get("JWT_ISSUER").unwrap_or_else(|| "opensase-storefront".to_string()),
                audience: get("JWT_AUDIENCE").unwrap_or_else(|| "opensase-storefront".to_string()),
                ttl_secs: parse(&get, "JWT_TTL_SECS", 3600)?,
            },
            payment: PaymentConfig {
                base_url: get("FLUTTERWAVE_BASE_URL").unwrap_or_else(|| "https://api.flutterwave.com/v3/".to_string()),
                secret_key: get("FLUTTERWAVE_SECRET_KEY").unwrap_or_default(),
            },
            image_root: get("IMAGE_ROOT").unwrap_or_else(|| "wwwroot".to_string()),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_database() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8083);
        assert!(config.database_url.is_none());
        assert_eq!(config.jwt.ttl_secs, 3600);
        assert_eq!(config.payment.base_url, "https://api.flutterwave.com/v3/");
    }

    #[test]
    fn test_database_requires_jwt_secret() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
