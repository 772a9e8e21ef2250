use std::env;
use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2id work factor. Digests embed these, so changing them only affects new hashes.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    /// `None` disables image upload.
    pub storage: Option<StorageConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            statement_timeout_secs: parse_or("DB_STATEMENT_TIMEOUT_SECS", 10)?,
        };

        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let jwt = JwtConfig {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "attendance".into()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "attendance-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 30)?,
        };
        check_ttl_minutes(jwt.ttl_minutes)?;

        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parse_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or("HASH_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            database,
            jwt,
            hashing,
            storage: storage_from_env()?,
        })
    }
}

/// One year.
const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;

fn check_ttl_minutes(minutes: i64) -> anyhow::Result<()> {
    if minutes <= 0 {
        bail!("JWT_TTL_MINUTES must be positive");
    }
    if minutes > MAX_TTL_MINUTES {
        bail!("JWT_TTL_MINUTES must not exceed {MAX_TTL_MINUTES}");
    }
    Ok(())
}

fn storage_from_env() -> anyhow::Result<Option<StorageConfig>> {
    let vars = [
        env::var("STORAGE_ENDPOINT").ok(),
        env::var("STORAGE_BUCKET").ok(),
        env::var("STORAGE_ACCESS_KEY").ok(),
        env::var("STORAGE_SECRET_KEY").ok(),
    ];
    match vars {
        [None, None, None, None] => Ok(None),
        [Some(endpoint), Some(bucket), Some(access_key), Some(secret_key)] => {
            Ok(Some(StorageConfig {
                endpoint,
                bucket,
                access_key,
                secret_key,
                region: env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            }))
        }
        _ => bail!(
            "STORAGE_ENDPOINT, STORAGE_BUCKET, STORAGE_ACCESS_KEY and STORAGE_SECRET_KEY must be set together"
        ),
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}: {e}")),
        Err(_) => Ok(default),
    }
}
