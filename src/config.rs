use std::str::FromStr;

use anyhow::Context;
use time::{macros::format_description, UtcOffset};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factor.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct KarmaConfig {
    /// Fixed offset whose midnight starts the "today" window.
    pub day_offset: UtcOffset,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub karma: KarmaConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            ttl_minutes: positive_ttl(env_or("JWT_TTL_MINUTES", 60)?)?,
        };
        let password = PasswordConfig {
            memory_kib: env_or("PASSWORD_MEMORY_KIB", argon2::Params::DEFAULT_M_COST)?,
            iterations: env_or("PASSWORD_ITERATIONS", argon2::Params::DEFAULT_T_COST)?,
            parallelism: env_or("PASSWORD_PARALLELISM", argon2::Params::DEFAULT_P_COST)?,
        };
        let day_offset = match std::env::var("KARMA_DAY_OFFSET") {
            Ok(raw) => parse_offset(&raw)?,
            Err(_) => UtcOffset::UTC,
        };

        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            jwt,
            password,
            karma: KarmaConfig { day_offset },
        })
    }
}

/// `default` when `key` is unset, an error when it is set but unparsable.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid {key} {raw:?}")),
    }
}

fn positive_ttl(minutes: i64) -> anyhow::Result<i64> {
    anyhow::ensure!(minutes > 0, "JWT_TTL_MINUTES must be positive, got {minutes}");
    Ok(minutes)
}

/// Parses `+HH:MM` / `-HH:MM`.
pub fn parse_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    UtcOffset::parse(
        raw.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .with_context(|| format!("invalid KARMA_DAY_OFFSET {raw:?}, expected e.g. +05:30"))
}
