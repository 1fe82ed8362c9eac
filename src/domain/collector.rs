//! Snapshot collector: runs every detector and resolver for one cycle and
//! assembles the result.
//!
//! Order: device → OS → browser → display → locale → network → location →
//! public IP → private IP. The geolocation fallback and the public-IP step
//! share a single lookup per cycle.

use std::time::Duration;

use anyhow::Result;
use chrono::{Local, Utc};
use rand::Rng;
use tokio::sync::OnceCell;

use crate::config::{CollectorConfig, LookupConfig};

use super::detect::{self, DeviceHints};
use super::geolocation::{GeolocationProvider, GeolocationResolver, PositionOptions};
use super::private_ip::{CandidateSource, PrivateIpResolver};
use super::public_ip::{LookupMode, PublicIpResolver};
use super::snapshot::{EnvironmentSnapshot, IpInfo};
use super::types::{ClientSignals, Variant, UNKNOWN};

const SESSION_ID_LEN: usize = 11;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Runtime capabilities available for one collection cycle.
pub struct Capabilities<'a> {
    pub geolocation: &'a dyn GeolocationProvider,
    pub candidates: &'a mut dyn CandidateSource,
}

pub struct SnapshotCollector {
    variant: Variant,
    geolocation: GeolocationResolver,
    public_ip: PublicIpResolver,
    private_ip: PrivateIpResolver,
}

impl SnapshotCollector {
    pub fn new(variant: Variant, lookup: &LookupConfig, collector: &CollectorConfig) -> Result<Self> {
        let options = PositionOptions {
            timeout: Duration::from_millis(collector.geolocation_timeout_ms),
            ..PositionOptions::default()
        };
        Ok(Self {
            variant,
            geolocation: GeolocationResolver::new(options),
            public_ip: PublicIpResolver::new(lookup)?,
            private_ip: PrivateIpResolver::new(Duration::from_millis(
                collector.private_ip_timeout_ms,
            )),
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Collect a complete snapshot. Every failure has already been replaced
    /// by a sentinel when this returns.
    pub async fn collect(
        &self,
        signals: &ClientSignals,
        capabilities: Capabilities<'_>,
    ) -> EnvironmentSnapshot {
        let user_agent = signals.user_agent.as_deref().unwrap_or(UNKNOWN);
        let platform = signals.platform.as_deref().unwrap_or(UNKNOWN);

        let device_type = detect::device_type(&DeviceHints::from(signals), self.variant);
        let os = detect::os(platform, user_agent);
        let browser = detect::browser(user_agent);
        let screen_resolution = detect::screen_resolution(signals.screen_width, signals.screen_height);
        let timezone = non_empty(signals.timezone.as_deref());
        let local_time = signals
            .local_time
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string());
        let network_type = detect::network_type(signals.connection.as_ref(), self.variant);
        let login_timestamp = Utc::now();
        let session_id = new_session_id();

        let mode = self.lookup_mode();
        let origin_host = signals.origin_host.as_deref();
        let lookup: OnceCell<IpInfo> = OnceCell::new();
        let lookup_ref = &lookup;
        let public_ip = &self.public_ip;

        let location = self
            .geolocation
            .resolve(capabilities.geolocation, move || async move {
                lookup_ref
                    .get_or_init(|| public_ip.resolve(mode, origin_host))
                    .await
                    .clone()
            })
            .await;

        let ip_info = lookup
            .get_or_init(|| self.public_ip.resolve(mode, origin_host))
            .await
            .clone();

        let private_ip = self.private_ip.resolve(capabilities.candidates).await;

        EnvironmentSnapshot {
            device_type,
            os,
            browser,
            screen_resolution,
            timezone,
            local_time,
            network_type,
            public_ip: ip_info.ip.clone(),
            private_ip,
            geo: ip_info.geo(),
            location,
            login_timestamp,
            session_id,
            variant: self.variant,
        }
    }

    fn lookup_mode(&self) -> LookupMode {
        match self.variant {
            Variant::Dashboard => LookupMode::Geo,
            Variant::Login => LookupMode::IpOnly,
        }
    }
}

fn non_empty(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// `session_<base36>`. A display label only; uniqueness is best-effort.
pub fn new_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SESSION_ID_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geolocation::{NoGeolocation, ReportedGeolocation};
    use crate::domain::private_ip::ReportedCandidates;
    use crate::domain::snapshot::{DeviceType, OsKind};
    use crate::domain::testing::{closed_endpoint, serve_json};
    use crate::domain::types::{ConnectionInfo, GeolocationReport, GeolocationStatus};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn collector(variant: Variant, endpoint: &str) -> SnapshotCollector {
        let lookup = LookupConfig {
            endpoint: endpoint.to_string(),
            loopback_endpoint: endpoint.to_string(),
            ip_only_endpoint: endpoint.to_string(),
            timeout_secs: 5,
        };
        SnapshotCollector::new(variant, &lookup, &CollectorConfig::default()).unwrap()
    }

    fn desktop_signals() -> ClientSignals {
        ClientSignals {
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".into()),
            platform: Some("Linux x86_64".into()),
            max_touch_points: Some(0),
            pointer_fine: Some(true),
            screen_width: Some(2560),
            screen_height: Some(1440),
            timezone: Some("Europe/Lisbon".into()),
            local_time: Some("10/16/2026, 9:41:00 AM".into()),
            connection: Some(ConnectionInfo {
                effective_type: "4g".into(),
                downlink: Some(9.2),
            }),
            geolocation: None,
            ice_candidates: vec!["candidate:1 1 udp 2113937151 192.168.0.17 50000 typ host".into()],
            origin_host: Some("nectar.example.org".into()),
        }
    }

    #[tokio::test]
    async fn empty_signals_produce_sentinels_everywhere() {
        let url = closed_endpoint().await;
        let collector = collector(Variant::Dashboard, &url);
        let mut candidates = ReportedCandidates::new(Vec::new());
        let snapshot = collector
            .collect(
                &ClientSignals::default(),
                Capabilities {
                    geolocation: &NoGeolocation,
                    candidates: &mut candidates,
                },
            )
            .await;

        assert_eq!(snapshot.device_type, DeviceType::Unknown);
        assert_eq!(snapshot.os, OsKind::Unknown);
        assert_eq!(snapshot.browser.name, "Unknown");
        assert_eq!(snapshot.screen_resolution, "Unknown");
        assert_eq!(snapshot.timezone, "Unknown");
        assert!(!snapshot.local_time.is_empty());
        assert_eq!(snapshot.network_type, "Unknown");
        assert_eq!(snapshot.public_ip, "Failed to fetch");
        assert_eq!(snapshot.private_ip, "Unknown");
        assert_eq!(snapshot.geo.city, "Unknown");
        assert_eq!(snapshot.location.latitude, "Unknown");
        assert_eq!(
            snapshot.location.accuracy,
            "IP-based Location: Unknown, Unknown, Unknown"
        );
        assert!(snapshot.session_id.starts_with("session_"));
    }

    #[tokio::test]
    async fn fallback_and_public_ip_share_one_lookup() {
        let server = serve_json(json!({
            "ip": "203.0.113.50",
            "city": "Lisbon",
            "region": "Lisbon",
            "country": "Portugal",
            "isp": "Example Telecom"
        }))
        .await;
        let collector = collector(Variant::Dashboard, &server.url);
        let signals = ClientSignals {
            geolocation: Some(GeolocationReport {
                status: GeolocationStatus::Denied,
                latitude: None,
                longitude: None,
                accuracy: None,
            }),
            ..desktop_signals()
        };
        let geolocation = ReportedGeolocation::new(signals.geolocation.clone());
        let mut candidates = ReportedCandidates::new(signals.ice_candidates.clone());

        let snapshot = collector
            .collect(
                &signals,
                Capabilities {
                    geolocation: &geolocation,
                    candidates: &mut candidates,
                },
            )
            .await;

        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.public_ip, "203.0.113.50");
        assert_eq!(snapshot.geo.isp, "Example Telecom");
        assert_eq!(
            snapshot.location.accuracy,
            "IP-based Location: Lisbon, Lisbon, Portugal"
        );
        assert_eq!(snapshot.private_ip, "192.168.0.17");
        assert_eq!(snapshot.device_type, DeviceType::Desktop);
        assert_eq!(snapshot.os, OsKind::Linux);
        assert_eq!(snapshot.browser.version, "128.0");
        assert_eq!(snapshot.screen_resolution, "2560 x 1440");
        assert_eq!(snapshot.network_type, "5G");
    }

    #[tokio::test]
    async fn granted_fix_uses_coordinates() {
        let server = serve_json(json!({ "ip": "192.0.2.10" })).await;
        let collector = collector(Variant::Login, &server.url);
        let signals = ClientSignals {
            geolocation: Some(GeolocationReport {
                status: GeolocationStatus::Granted,
                latitude: Some(38.7223),
                longitude: Some(-9.1393),
                accuracy: Some(20.4),
            }),
            ..desktop_signals()
        };
        let geolocation = ReportedGeolocation::new(signals.geolocation.clone());
        let mut candidates = ReportedCandidates::new(Vec::new());

        let snapshot = collector
            .collect(
                &signals,
                Capabilities {
                    geolocation: &geolocation,
                    candidates: &mut candidates,
                },
            )
            .await;

        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.location.latitude, "38.722300");
        assert_eq!(snapshot.location.accuracy, "20 meters");
        assert_eq!(snapshot.public_ip, "192.0.2.10");
        assert_eq!(snapshot.geo.city, "Unknown");
        assert_eq!(snapshot.network_type, "WiFi (5G)");
        assert_eq!(snapshot.variant, Variant::Login);
    }

    #[test]
    fn session_ids_are_labelled_base36() {
        let id = new_session_id();
        let suffix = id.strip_prefix("session_").unwrap();
        assert_eq!(suffix.len(), SESSION_ID_LEN);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(new_session_id(), new_session_id());
    }
}
