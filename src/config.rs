use std::env;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid number, got '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Settings for the hosted checkout link and the provider's webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub merchant_id: String,
    pub checkout_url: String,
    /// Where the provider sends the buyer back; `{user_id}` is substituted.
    pub return_url: String,
    /// Shared secret expected in `X-Webhook-Token`. Unset disables the check.
    pub webhook_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    pub payment: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(get("PORT"), "PORT", 8080)?;
        let pool_size = parse_or(get("DB_POOL_SIZE"), "DB_POOL_SIZE", 10)?;

        Ok(Self {
            database_url,
            host,
            port,
            pool_size,
            payment: PaymentConfig {
                merchant_id: get("PAYMENT_MERCHANT_ID").unwrap_or_default(),
                checkout_url: get("PAYMENT_CHECKOUT_URL")
                    .unwrap_or_else(|| "https://checkout.paycom.uz".to_string()),
                return_url: get("PAYMENT_RETURN_URL").unwrap_or_default(),
                webhook_token: get("PAYMENT_WEBHOOK_TOKEN"),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
