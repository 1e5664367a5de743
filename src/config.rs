// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Which backend holds users, posts and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORE",
                value: other.to_string(),
            }),
        }
    }
}

/// `burst` requests per `window` and client. Spent budget comes back evenly,
/// one request every `window / burst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub burst: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn new(burst: u32, window: Duration) -> Self {
        Self { burst, window }
    }

    pub const fn per_hour(burst: u32) -> Self {
        Self::new(burst, Duration::from_secs(60 * 60))
    }

    /// Never zero, so a limiter can always be built from it.
    pub fn burst_size(&self) -> u32 {
        self.burst.max(1)
    }

    /// Time for one request of the budget to come back. Never zero.
    pub fn replenish_interval(&self) -> Duration {
        (self.window / self.burst_size()).max(Duration::from_millis(1))
    }
}

/// Per-IP budgets for the routes that are expensive or brute-forceable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimits {
    pub login: RateLimit,
    pub create_post: RateLimit,
    pub update_post: RateLimit,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: RateLimit::new(10, Duration::from_secs(3 * 60 * 60)),
            create_post: RateLimit::per_hour(5),
            update_post: RateLimit::per_hour(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    /// Only required when `store` is `Postgres`.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Origin allowed by CORS (the blog frontend).
    pub website_url: String,
    pub rate_limits: RateLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let store = match env::var("STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreKind::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400)?;
        let port = parse_or("PORT", 3000)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let website_url =
            env::var("WEBSITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            store,
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            website_url,
            rate_limits: RateLimits::default(),
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_parses_case_insensitively() {
        assert_eq!("Memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("postgres".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert!("mongo".parse::<StoreKind>().is_err());
    }

    #[test]
    fn login_budget_refills_one_attempt_every_eighteen_minutes() {
        let login = RateLimits::default().login;
        assert_eq!(login.burst_size(), 10);
        assert_eq!(login.replenish_interval(), Duration::from_secs(18 * 60));
    }

    #[test]
    fn zero_budget_still_yields_a_usable_limit() {
        let limit = RateLimit::new(0, Duration::ZERO);
        assert_eq!(limit.burst_size(), 1);
        assert_eq!(limit.replenish_interval(), Duration::from_millis(1));
    }
}
