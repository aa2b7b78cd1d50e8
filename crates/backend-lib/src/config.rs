// ============================
// edugame-backend/src/config.rs
// ============================
//! Configuration management.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file, then
//! `EDUGAME_`-prefixed environment variables (nested keys split on `__`).
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "edugame.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EDUGAME_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// SQLite connection URL
    pub database_url: String,
    /// Pool size
    pub max_connections: u32,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    pub password: PasswordSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Password policy and Argon2 cost parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PasswordSettings {
    /// Minimum password length in characters
    pub min_length: usize,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// One token-bucket policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatePolicy {
    pub rate_per_second: f64,
    pub burst: u32,
}

impl RatePolicy {
    pub const fn new(rate_per_second: f64, burst: u32) -> Self {
        Self {
            rate_per_second,
            burst,
        }
    }
}

/// Rate limit settings per route class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitSettings {
    pub general: RatePolicy,
    /// Export/import routes
    pub export: RatePolicy,
    /// Credential checks
    pub login: RatePolicy,
    /// Bucket cap per limiter before LRU eviction kicks in
    pub max_buckets: usize,
    pub idle_ttl_secs: u64,
    pub reclaim_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/accounts.db".to_string(),
            max_connections: 5,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            password: PasswordSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        // OWASP's Argon2id baseline: 19 MiB, 2 passes, 1 lane
        Self {
            min_length: 6,
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            general: RatePolicy::new(100.0, 20),
            export: RatePolicy::new(10.0, 2),
            login: RatePolicy::new(0.2, 5),
            max_buckets: 10_000,
            idle_ttl_secs: 10 * 60,
            reclaim_interval_secs: 5 * 60,
        }
    }
}

impl RateLimitSettings {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }
}

impl Settings {
    /// Load from `edugame.toml` (if present) and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from an explicit TOML file (missing files are skipped) and the
    /// environment, then validate.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Semantic checks serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log level `{}`", self.log_level);
        }
        if self.database_url.trim().is_empty() {
            bail!("database_url must not be empty");
        }
        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        if self.password.min_length == 0 {
            bail!("password.min_length must be at least 1");
        }
        if self.password.iterations == 0 || self.password.parallelism == 0 {
            bail!("password.iterations and password.parallelism must be at least 1");
        }

        let rl = &self.rate_limit;
        for (name, policy) in [("general", rl.general), ("export", rl.export), ("login", rl.login)] {
            if !(policy.rate_per_second > 0.0 && policy.rate_per_second.is_finite()) {
                bail!("rate_limit.{name}.rate_per_second must be positive");
            }
            if policy.burst == 0 {
                bail!("rate_limit.{name}.burst must be at least 1");
            }
        }
        if rl.max_buckets == 0 {
            bail!("rate_limit.max_buckets must be at least 1");
        }
        if rl.reclaim_interval_secs == 0 {
            bail!("rate_limit.reclaim_interval_secs must be at least 1");
        }

        Ok(())
    }
}
