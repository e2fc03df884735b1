use anyhow::{Context, Result, bail};
use auth_validate::jwt::JwtKeys;
use chrono::Duration;
use config::{Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub product_cache_ttl_secs: u64,
    pub jwt_private_key: Option<String>,
    pub jwt_public_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_expiry_days: i64,
    pub reset_code_ttl_minutes: i64,
    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
    pub admin_emails: String,
    pub log_filter: String,
}

impl Config {
    /// Defaults, then `config/invest_market.toml`, then `INVEST__*` variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_builder(
            config::Config::builder()
                .add_source(File::with_name("config/invest_market").required(false))
                .add_source(
                    Environment::with_prefix("INVEST")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let cfg = builder
            .set_default("host", "127.0.0.1")?
            .set_default("port", 7878)?
            .set_default("storage", "postgres")?
            .set_default("database_max_connections", 10)?
            .set_default("product_cache_ttl_secs", 300)?
            .set_default("jwt_expiry_days", 7)?
            .set_default("reset_code_ttl_minutes", 15)?
            .set_default("password_hash_memory_kib", 19456)?
            .set_default("password_hash_iterations", 2)?
            .set_default("admin_emails", "")?
            .set_default("log_filter", "info")?
            .build()
            .context("failed to build configuration")?;
        let config: Config = cfg
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.storage == StorageKind::Postgres && self.database_url.is_none() {
            bail!("database_url is required when storage = postgres");
        }
        if self.jwt_expiry_days <= 0 || self.reset_code_ttl_minutes <= 0 {
            bail!("token lifetimes must be positive");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// RS256 when both PEM keys are set, HS256 with `jwt_secret` otherwise.
    pub fn jwt_keys(&self) -> Result<JwtKeys> {
        match (&self.jwt_private_key, &self.jwt_public_key, &self.jwt_secret) {
            (Some(private), Some(public), _) => {
                JwtKeys::from_rsa_pem(private, public).context("invalid JWT key pair")
            }
            (_, _, Some(secret)) if !secret.is_empty() => Ok(JwtKeys::from_secret(secret.as_bytes())),
            _ => bail!("either jwt_private_key/jwt_public_key or jwt_secret must be set"),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::days(self.jwt_expiry_days)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::minutes(self.reset_code_ttl_minutes)
    }

    pub fn admin_emails(&self) -> Vec<String> {
        self.admin_emails
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}
