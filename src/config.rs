use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::auth::Credential;
use crate::domain::types::Variant;

const ENV_PREFIX: &str = "NECTAR_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,
    pub log_level: String,
    pub variant: Variant,
    /// Base URL of a running daemon, used by `nectar query`.
    pub daemon_url: String,
    pub lookup: LookupConfig,
    pub collector: CollectorConfig,
    pub credentials: Vec<Credential>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:9300".to_string(),
            log_level: "info".to_string(),
            variant: Variant::default(),
            daemon_url: "http://127.0.0.1:9300".to_string(),
            lookup: LookupConfig::default(),
            collector: CollectorConfig::default(),
            credentials: Credential::defaults(),
        }
    }
}

/// Public-IP lookup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub endpoint: String,
    /// Used instead of `endpoint` when the page origin is a loopback host.
    pub loopback_endpoint: String,
    pub ip_only_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ipapi.co/json/".to_string(),
            loopback_endpoint: "http://ip-api.com/json".to_string(),
            ip_only_endpoint: "https://api.ipify.org?format=json".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub geolocation_timeout_ms: u64,
    pub private_ip_timeout_ms: u64,
    /// Address the CLI's UDP probe "connects" toward. No datagram is sent.
    pub probe_target: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            geolocation_timeout_ms: 10_000,
            private_ip_timeout_ms: 1_000,
            probe_target: "8.8.8.8:80".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("nectar").join("config.yaml"))
    }
}

/// Defaults, then the YAML file (explicit path or `~/.config/nectar/config.yaml`),
/// then `NECTAR_*` environment variables (`__` separates nested keys).
pub fn load(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file {} does not exist", p.display());
            }
            Some(p.to_path_buf())
        }
        None => Config::path().ok().filter(|p| p.exists()),
    };

    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(file) = &file {
        figment = figment.merge(Yaml::file(file));
    }
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| match &file {
            Some(f) => format!("loading configuration from {}", f.display()),
            None => "loading configuration".to_string(),
        })
}
