use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const DEFAULT_CACHE_TTL_MS: u64 = 1000 * 60 * 60 * 6;

/// Contents written by `fxrates setup`.
pub const DEFAULT_CONFIG: &str = r#"---
listen_addr: "0.0.0.0:3000"

# How long rates are served before a refresh, in milliseconds.
# The EXPIRY environment variable overrides this.
cache_ttl_ms: 21600000

# Serve files from this directory for paths outside the API.
# static_dir: "public"

providers:
  ecb:
    base_url: "https://www.ecb.europa.eu"
    path: "/stats/eurofxref/eurofxref-daily.xml"
    timeout_ms: 10000
"#;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EcbProviderConfig {
    pub base_url: String,
    #[serde(default = "default_ecb_path")]
    pub path: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EcbProviderConfig {
    fn default() -> Self {
        EcbProviderConfig {
            base_url: "https://www.ecb.europa.eu".to_string(),
            path: default_ecb_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl EcbProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ecb: EcbProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// How long a rate table is served before a refresh is attempted.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Directory of static files served for paths outside the API.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen_addr: default_listen_addr(),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            static_dir: None,
            providers: ProvidersConfig::default(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_ecb_path() -> String {
    "/stats/eurofxref/eurofxref-daily.xml".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl AppConfig {
    /// Loads the config file from the default location, falling back to the
    /// built-in defaults when no file has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fxrates", "fxrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies `EXPIRY` (cache TTL in milliseconds) and `PORT` overrides from
    /// the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(expiry) = lookup("EXPIRY") {
            self.cache_ttl_ms = expiry
                .trim()
                .parse()
                .with_context(|| format!("Invalid EXPIRY value: '{expiry}'"))?;
            debug!(cache_ttl_ms = self.cache_ttl_ms, "Cache TTL overridden from environment");
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: '{port}'"))?;
            self.listen_addr.set_port(port);
        }
        Ok(self)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}
