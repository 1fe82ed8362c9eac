//! Dashboard service: owns the collector, the authenticator and the single
//! "current snapshot" slot.
//!
//! Readers see either no snapshot or a complete one: a cycle finishes first,
//! then the whole snapshot is swapped in under the write lock.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;

use super::auth::{Authenticator, LoginForm, LoginState, StaticCredentials};
use super::collector::{Capabilities, SnapshotCollector};
use super::geolocation::ReportedGeolocation;
use super::private_ip::ReportedCandidates;
use super::snapshot::EnvironmentSnapshot;
use super::types::{ClientSignals, DaemonHealth, Variant};

pub struct DashboardService {
    slot: RwLock<Option<Arc<EnvironmentSnapshot>>>,
    collector: SnapshotCollector,
    authenticator: Authenticator,
    start_time: Instant,
}

impl DashboardService {
    pub fn new(config: &Config) -> Result<Arc<Self>> {
        let collector = SnapshotCollector::new(config.variant, &config.lookup, &config.collector)?;
        let authenticator = Authenticator::new(Arc::new(StaticCredentials::new(
            config.credentials.clone(),
        )));

        Ok(Arc::new(Self {
            slot: RwLock::new(None),
            collector,
            authenticator,
            start_time: Instant::now(),
        }))
    }

    /// Run one collection cycle from browser-reported signals and publish it.
    pub async fn collect(&self, signals: ClientSignals) -> Arc<EnvironmentSnapshot> {
        let geolocation = ReportedGeolocation::new(signals.geolocation.clone());
        let mut candidates = ReportedCandidates::new(signals.ice_candidates.clone());

        let snapshot = Arc::new(
            self.collector
                .collect(
                    &signals,
                    Capabilities {
                        geolocation: &geolocation,
                        candidates: &mut candidates,
                    },
                )
                .await,
        );

        *self.slot.write().await = Some(snapshot.clone());
        info!(
            session_id = %snapshot.session_id,
            device = %snapshot.device_type,
            os = %snapshot.os,
            "snapshot published"
        );

        snapshot
    }

    /// The current snapshot. Never triggers collection.
    pub async fn current(&self) -> Option<Arc<EnvironmentSnapshot>> {
        self.slot.read().await.clone()
    }

    pub fn login(&self, state: &LoginState, form: &LoginForm) -> LoginState {
        self.authenticator.attempt(state, form)
    }

    pub fn variant(&self) -> Variant {
        self.collector.variant()
    }

    pub async fn health(&self) -> DaemonHealth {
        DaemonHealth {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            variant: self.variant(),
            snapshot_ready: self.slot.read().await.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::LoginErrorTag;
    use crate::domain::testing::closed_endpoint;

    async fn service() -> Arc<DashboardService> {
        let mut config = Config::default();
        let url = closed_endpoint().await;
        config.lookup.endpoint = url.clone();
        config.lookup.loopback_endpoint = url.clone();
        config.lookup.ip_only_endpoint = url;
        DashboardService::new(&config).unwrap()
    }

    #[tokio::test]
    async fn slot_is_empty_until_a_cycle_completes() {
        let svc = service().await;
        assert!(svc.current().await.is_none());
        assert!(!svc.health().await.snapshot_ready);

        let published = svc.collect(ClientSignals::default()).await;
        let current = svc.current().await.expect("snapshot published");
        assert_eq!(current.session_id, published.session_id);
        assert_eq!(current.public_ip, "Failed to fetch");
        assert!(svc.health().await.snapshot_ready);
    }

    #[tokio::test]
    async fn new_cycle_replaces_the_snapshot() {
        let svc = service().await;
        let first = svc.collect(ClientSignals::default()).await;
        let second = svc
            .collect(ClientSignals {
                platform: Some("Win32".into()),
                ..ClientSignals::default()
            })
            .await;

        let current = svc.current().await.unwrap();
        assert_eq!(current.session_id, second.session_id);
        assert_ne!(current.session_id, first.session_id);
        // the earlier snapshot is untouched
        assert_eq!(first.os.to_string(), "Unknown");
        assert_eq!(current.os.to_string(), "Windows");
    }

    #[tokio::test]
    async fn login_uses_configured_credentials() {
        let svc = service().await;
        let state = svc.login(
            &LoginState::default(),
            &LoginForm {
                username: "user2".into(),
                password: "bad".into(),
            },
        );
        assert_eq!(state.error, Some(LoginErrorTag::Pass));
    }
}
