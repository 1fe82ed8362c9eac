//! Public-IP/ISP resolver.
//!
//! One GET to an IP-geolocation service. Providers disagree on field names
//! (`ip`/`query`, `region`/`regionName`, `isp`/`org`), so responses are
//! normalized into [`IpInfo`]. The body is decoded whatever the status, so a
//! JSON error reply normalizes to "Unknown" fields. Transport and decode
//! failures yield [`IpInfo::failed`]; there is no retry.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LookupConfig;

use super::snapshot::IpInfo;
use super::types::UNKNOWN;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("requesting {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("decoding response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Address plus city/region/country/ISP.
    Geo,
    /// Address only; every geo field stays "Unknown".
    IpOnly,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    ip: Option<String>,
    query: Option<String>,
    city: Option<String>,
    region: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    country: Option<String>,
    isp: Option<String>,
    org: Option<String>,
}

impl LookupResponse {
    fn normalize(self) -> IpInfo {
        IpInfo {
            ip: first_present([self.ip, self.query]),
            city: first_present([self.city]),
            region: first_present([self.region, self.region_name]),
            country: first_present([self.country]),
            isp: first_present([self.isp, self.org]),
        }
    }
}

/// First non-empty candidate, else "Unknown".
fn first_present<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn is_loopback_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
}

pub struct PublicIpResolver {
    http: Client,
    config: LookupConfig,
}

impl PublicIpResolver {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building lookup HTTP client")?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn endpoint(&self, mode: LookupMode, origin_host: Option<&str>) -> &str {
        match mode {
            LookupMode::IpOnly => &self.config.ip_only_endpoint,
            LookupMode::Geo if origin_host.is_some_and(is_loopback_host) => {
                &self.config.loopback_endpoint
            }
            LookupMode::Geo => &self.config.endpoint,
        }
    }

    pub async fn resolve(&self, mode: LookupMode, origin_host: Option<&str>) -> IpInfo {
        let url = self.endpoint(mode, origin_host);
        match self.fetch(url).await {
            Ok(response) => {
                let info = response.normalize();
                debug!(ip = %info.ip, "public IP resolved");
                info
            }
            Err(e) => {
                warn!(error = %e, "error fetching IP info");
                IpInfo::failed()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<LookupResponse, LookupError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| LookupError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), url, "lookup returned an error status");
        }

        resp.json().await.map_err(|source| LookupError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
