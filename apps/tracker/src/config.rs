use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;

const DEFAULT_LISTING_URL: &str = "https://myanimelist.net/people.php";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub listing_url: String,
    pub fetch_timeout: Duration,
    pub request_delay: Duration,
    pub rust_log: String,
}

/// Where the snapshot store lives: either a full URL or discrete parameters.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    Url(String),
    Params {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
    },
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let database = match std::env::var("DATABASE_URL") {
            Ok(url) => DatabaseConfig::Url(url),
            Err(_) => DatabaseConfig::Params {
                host: require_env("MAL_PEOPLE_HOST")?,
                port: parse_env("MAL_PEOPLE_PORT", 5432)?,
                database: require_env("MAL_PEOPLE_DB")?,
                user: require_env("MAL_PEOPLE_USER")?,
                password: require_env("MAL_PEOPLE_PASSWORD")?,
            },
        };

        Ok(Config {
            database,
            listing_url: std::env::var("LISTING_URL")
                .unwrap_or_else(|_| DEFAULT_LISTING_URL.to_string()),
            fetch_timeout: Duration::from_secs(parse_env("FETCH_TIMEOUT_SECS", 30)?),
            request_delay: Duration::from_millis(parse_env("REQUEST_DELAY_MS", 1000)?),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            DatabaseConfig::Url(url) => url
                .parse::<PgConnectOptions>()
                .context("DATABASE_URL is not a valid Postgres URL"),
            DatabaseConfig::Params {
                host,
                port,
                database,
                user,
                password,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(database)
                .username(user)
                .password(password)),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
