//! Server configuration loaded from environment variables.
//!
//! Everything has a default except that production refuses the
//! development signature bypass.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};

use missive_crypto::signature::SignaturePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
    Test,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => bail!("unknown MISSIVE_ENV {:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `MISSIVE_HOST`, `MISSIVE_PORT`. Default `0.0.0.0:3000`.
    pub addr: SocketAddr,

    /// Env: `MISSIVE_DB_PATH`. Default `missive.db`.
    pub db_path: PathBuf,

    /// Env: `MISSIVE_ENV`. Default production.
    pub environment: Environment,

    /// Env: `MISSIVE_DEV_SIGNATURES=true` accepts `FAKE:<publicKey>`.
    pub dev_signatures: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 3000).into(),
            db_path: PathBuf::from("missive.db"),
            environment: Environment::Production,
            dev_signatures: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests need not touch the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        let host = get("MISSIVE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = match get("MISSIVE_PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid MISSIVE_PORT {:?}", p))?,
            None => 3000,
        };
        config.addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        if let Some(path) = get("MISSIVE_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(env) = get("MISSIVE_ENV") {
            config.environment = env.parse()?;
        }
        if let Some(flag) = get("MISSIVE_DEV_SIGNATURES") {
            config.dev_signatures = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        if config.dev_signatures && config.environment == Environment::Production {
            bail!("MISSIVE_DEV_SIGNATURES cannot be enabled in production");
        }

        Ok(config)
    }

    pub fn signature_policy(&self) -> SignaturePolicy {
        if self.dev_signatures {
            SignaturePolicy::AllowDevBypass
        } else {
            SignaturePolicy::Strict
        }
    }

    /// Administrative routes are never mounted in production.
    pub fn admin_routes(&self) -> bool {
        self.environment != Environment::Production
    }
}
