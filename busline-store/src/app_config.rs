use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String { "busline:".to_string() }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// JSON array of routes. The built-in schedule is used when unset.
    pub seed_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Upper bound on waiting for the per-(route, date) lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Attempts at the partition compare-and-swap before giving up.
    #[serde(default = "default_max_cas_retries")]
    pub max_cas_retries: u32,
}

fn default_lock_timeout_ms() -> u64 { 2_000 }
fn default_max_cas_retries() -> u32 { 5 }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            max_cas_retries: default_max_cas_retries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// Unpaid bookings older than this are cancelled by the sweeper.
    /// Unset means holds never expire.
    pub hold_ttl_seconds: Option<u64>,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_sweep_interval() -> u64 { 60 }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            hold_ttl_seconds: None,
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::from(dir.join("default")))
            // Optional per-environment overrides
            .add_source(config::File::from(dir.join(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::from(dir.join("local")).required(false))
            // BUSLINE__SERVER__PORT=8080 overrides server.port
            .add_source(
                config::Environment::with_prefix("BUSLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
