//! Environment-driven configuration. `dotenvy` loads `.env` before this runs.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::email::BusinessProfile;
use crate::domain::value_objects::Money;

const INSECURE_JWT_SECRET: &str = "insecure-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub email: String,
    pub name: String,
    /// bcrypt hash. Without it admin login is disabled.
    pub password_hash: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub secure_cookies: bool,
    pub admin: AdminAccount,
    pub ai: Option<AiConfig>,
    pub mail: Option<MailConfig>,
    pub business: BusinessProfile,
    /// Where contact-form messages are delivered.
    pub business_inbox: String,
    pub installation_fee: Money,
}

fn parse<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using insecure default!");
            INSECURE_JWT_SECRET.to_string()
        });
        let defaults = BusinessProfile::default();
        let business = BusinessProfile {
            name: get("BUSINESS_NAME").unwrap_or(defaults.name),
            email: get("BUSINESS_EMAIL").unwrap_or(defaults.email),
            phone: get("BUSINESS_PHONE").unwrap_or(defaults.phone),
            website: get("BUSINESS_WEBSITE").unwrap_or(defaults.website),
        };
        let ai = get("AI_API_URL").map(|url| AiConfig { url, api_key: get("AI_API_KEY"), model: get("AI_MODEL") });
        let mail = get("MAIL_API_URL").map(|url| MailConfig {
            url,
            api_key: get("MAIL_API_KEY"),
            from: get("MAIL_FROM").unwrap_or_else(|| business.email.clone()),
        });
        let fee: Decimal = parse("INSTALLATION_FEE", get("INSTALLATION_FEE"), Decimal::from(500))?;
        if fee.is_sign_negative() {
            return Err(ConfigError::Invalid { key: "INSTALLATION_FEE", value: fee.to_string() });
        }

        Ok(Self {
            port: parse("PORT", get("PORT"), 8083)?,
            database_url: get("DATABASE_URL"),
            nats_url: get("NATS_URL"),
            jwt_secret,
            token_ttl_hours: parse("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), 24)?,
            secure_cookies: parse("SECURE_COOKIES", get("SECURE_COOKIES"), true)?,
            admin: AdminAccount {
                email: get("ADMIN_EMAIL").unwrap_or_else(|| business.email.clone()),
                name: get("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                password_hash: get("ADMIN_PASSWORD_HASH"),
            },
            ai,
            mail,
            business_inbox: get("BUSINESS_INBOX").unwrap_or_else(|| business.email.clone()),
            business,
            installation_fee: Money::new(fee),
        })
    }

    pub fn uses_insecure_secret(&self) -> bool { self.jwt_secret == INSECURE_JWT_SECRET }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8083);
        assert!(config.database_url.is_none());
        assert!(config.ai.is_none() && config.mail.is_none());
        assert!(config.uses_insecure_secret());
        assert_eq!(config.installation_fee, Money::dollars(500));
        assert_eq!(config.business_inbox, config.business.email);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9000"), ("JWT_SECRET", "s3cret"), ("INSTALLATION_FEE", "750.50"),
            ("AI_API_URL", "http://ai.local/generate"), ("MAIL_API_URL", "http://mail.local/send"), ("MAIL_FROM", "office@church.av"),
        ])).unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.uses_insecure_secret());
        assert_eq!(config.installation_fee, Money::from_cents(75050));
        assert_eq!(config.ai.unwrap().url, "http://ai.local/generate");
        assert_eq!(config.mail.unwrap().from, "office@church.av");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[("PORT", "eighty")])), Err(ConfigError::Invalid { key: "PORT", .. })));
        assert!(AppConfig::from_lookup(lookup(&[("INSTALLATION_FEE", "-5")])).is_err());
    }
}
