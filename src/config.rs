use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "natours-development-secret-do-not-use-in-prod";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("JWT_SECRET must be at least 32 characters in production")]
    WeakSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub db_path: String,
    pub static_dir: String,
    pub jwt_secret: String,
    pub jwt_expires_in_days: i64,
    pub jwt_cookie_expires_in_days: i64,
    pub bcrypt_cost: u32,
    pub site_url: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment: Environment = try_load("NATOURS_ENV", "development")?;

        let jwt_secret = match optional("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == Environment::Production => {
                return Err(ConfigError::Missing("JWT_SECRET"))
            }
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };
        if environment == Environment::Production && jwt_secret.len() < 32 {
            return Err(ConfigError::WeakSecret);
        }

        Ok(Self {
            host: try_load("NATOURS_HOST", "127.0.0.1")?,
            port: try_load("NATOURS_PORT", "3000")?,
            environment,
            db_path: try_load("NATOURS_DB_PATH", "natours.db")?,
            static_dir: try_load("NATOURS_STATIC_DIR", "public")?,
            jwt_secret,
            jwt_expires_in_days: try_load("JWT_EXPIRES_IN_DAYS", "90")?,
            jwt_cookie_expires_in_days: try_load("JWT_COOKIE_EXPIRES_IN_DAYS", "90")?,
            bcrypt_cost: try_load("BCRYPT_COST", "12")?,
            site_url: try_load::<String>("SITE_URL", "http://localhost:3000")?
                .trim_end_matches('/')
                .to_string(),
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: try_load::<String>("STRIPE_API_BASE", "https://api.stripe.com")?
                .trim_end_matches('/')
                .to_string(),
            rate_limit_max: try_load("RATE_LIMIT_MAX", "100")?,
            rate_limit_window_secs: try_load("RATE_LIMIT_WINDOW_SECS", "3600")?,
        })
    }

    /// Settings for tests and local tooling: in-memory database, cheap
    /// bcrypt, no payment processor.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: Environment::Development,
            db_path: ":memory:".to_string(),
            static_dir: "public".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in_days: 90,
            jwt_cookie_expires_in_days: 90,
            bcrypt_cost: 4,
            site_url: "http://localhost:3000".to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: Some("whsec_test_secret".to_string()),
            stripe_api_base: "https://api.stripe.com".to_string(),
            rate_limit_max: 1000,
            rate_limit_window_secs: 3600,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
