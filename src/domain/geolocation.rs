//! Geolocation resolver: one fresh high-accuracy fix with a bounded wait,
//! falling back to the public-IP lookup when the fix is unavailable.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::snapshot::{IpInfo, LocationInfo};
use super::types::{Capability, GeolocationReport, GeolocationStatus, Position, UNKNOWN};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Zero: never reuse a cached fix.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Capability<Position>;
}

/// Position outcome reported by the browser page.
pub struct ReportedGeolocation {
    report: Option<GeolocationReport>,
}

impl ReportedGeolocation {
    pub fn new(report: Option<GeolocationReport>) -> Self {
        Self { report }
    }
}

#[async_trait]
impl GeolocationProvider for ReportedGeolocation {
    async fn current_position(&self, _options: &PositionOptions) -> Capability<Position> {
        let Some(report) = &self.report else {
            return Capability::Unsupported;
        };
        match report.status {
            GeolocationStatus::Granted => match (report.latitude, report.longitude) {
                (Some(latitude), Some(longitude)) => Capability::Success(Position {
                    latitude,
                    longitude,
                    accuracy: report.accuracy,
                }),
                // a grant without coordinates is treated like a failed fix
                _ => Capability::Denied,
            },
            GeolocationStatus::Denied => Capability::Denied,
            GeolocationStatus::TimedOut => Capability::TimedOut,
            GeolocationStatus::Unsupported => Capability::Unsupported,
        }
    }
}

/// For runtimes with no positioning capability at all (the CLI).
pub struct NoGeolocation;

#[async_trait]
impl GeolocationProvider for NoGeolocation {
    async fn current_position(&self, _options: &PositionOptions) -> Capability<Position> {
        Capability::Unsupported
    }
}

pub struct GeolocationResolver {
    options: PositionOptions,
}

impl GeolocationResolver {
    pub fn new(options: PositionOptions) -> Self {
        Self { options }
    }

    /// Resolve a location. Never fails: any outcome other than a fix uses
    /// `ip_fallback` and reports the IP-derived place as the accuracy.
    pub async fn resolve<F, Fut>(
        &self,
        provider: &dyn GeolocationProvider,
        ip_fallback: F,
    ) -> LocationInfo
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = IpInfo>,
    {
        debug!(
            high_accuracy = self.options.high_accuracy,
            maximum_age_ms = self.options.maximum_age.as_millis() as u64,
            "requesting position"
        );
        let outcome =
            match tokio::time::timeout(self.options.timeout, provider.current_position(&self.options))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Capability::TimedOut,
            };

        match outcome {
            Capability::Success(position) => {
                debug!("geolocation fix acquired");
                from_position(&position)
            }
            other => {
                warn!(
                    reason = other.label(),
                    "geolocation unavailable, using IP-based location"
                );
                ip_based(&ip_fallback().await)
            }
        }
    }
}

fn from_position(position: &Position) -> LocationInfo {
    LocationInfo {
        latitude: format!("{:.6}", position.latitude),
        longitude: format!("{:.6}", position.longitude),
        accuracy: position
            .accuracy
            .map(|meters| format!("{} meters", meters.round() as i64))
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

fn ip_based(info: &IpInfo) -> LocationInfo {
    LocationInfo {
        latitude: UNKNOWN.to_string(),
        longitude: UNKNOWN.to_string(),
        accuracy: format!(
            "IP-based Location: {}, {}, {}",
            info.city, info.region, info.country
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Capability<Position>);

    #[async_trait]
    impl GeolocationProvider for Fixed {
        async fn current_position(&self, _options: &PositionOptions) -> Capability<Position> {
            self.0.clone()
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl GeolocationProvider for NeverAnswers {
        async fn current_position(&self, _options: &PositionOptions) -> Capability<Position> {
            std::future::pending().await
        }
    }

    fn lisbon() -> IpInfo {
        IpInfo {
            ip: "198.51.100.4".into(),
            city: "Lisbon".into(),
            region: "Lisbon".into(),
            country: "Portugal".into(),
            isp: "Example Telecom".into(),
        }
    }

    #[tokio::test]
    async fn fix_is_rounded() {
        let resolver = GeolocationResolver::new(PositionOptions::default());
        let provider = Fixed(Capability::Success(Position {
            latitude: 38.722252349,
            longitude: -9.139336812,
            accuracy: Some(12.5),
        }));
        let location = resolver
            .resolve(&provider, || async { IpInfo::failed() })
            .await;
        assert_eq!(location.latitude, "38.722252");
        assert_eq!(location.longitude, "-9.139337");
        assert_eq!(location.accuracy, "13 meters");
    }

    #[tokio::test]
    async fn denied_falls_back_to_ip_location() {
        let resolver = GeolocationResolver::new(PositionOptions::default());
        let location = resolver
            .resolve(&Fixed(Capability::Denied), || async { lisbon() })
            .await;
        assert_eq!(location.latitude, "Unknown");
        assert_eq!(location.longitude, "Unknown");
        assert!(location.accuracy.contains("Lisbon, Lisbon, Portugal"));
    }

    #[tokio::test]
    async fn unsupported_falls_back_with_failed_lookup() {
        let resolver = GeolocationResolver::new(PositionOptions::default());
        let location = resolver
            .resolve(&NoGeolocation, || async { IpInfo::failed() })
            .await;
        assert_eq!(
            location.accuracy,
            "IP-based Location: Unknown, Unknown, Unknown"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_provider_times_out() {
        let resolver = GeolocationResolver::new(PositionOptions::default());
        let location = resolver.resolve(&NeverAnswers, || async { lisbon() }).await;
        assert_eq!(location.latitude, "Unknown");
        assert!(location.accuracy.starts_with("IP-based Location: Lisbon"));
    }

    #[tokio::test]
    async fn reported_outcomes_map_to_capabilities() {
        let options = PositionOptions::default();
        let granted = ReportedGeolocation::new(Some(GeolocationReport {
            status: GeolocationStatus::Granted,
            latitude: Some(1.0),
            longitude: Some(2.0),
            accuracy: Some(3.0),
        }));
        assert_eq!(
            granted.current_position(&options).await,
            Capability::Success(Position {
                latitude: 1.0,
                longitude: 2.0,
                accuracy: Some(3.0)
            })
        );

        let missing = ReportedGeolocation::new(None);
        assert_eq!(
            missing.current_position(&options).await,
            Capability::Unsupported
        );

        let empty_grant = ReportedGeolocation::new(Some(GeolocationReport {
            status: GeolocationStatus::Granted,
            latitude: None,
            longitude: None,
            accuracy: None,
        }));
        assert_eq!(empty_grant.current_position(&options).await, Capability::Denied);
    }

    #[tokio::test]
    async fn fix_without_accuracy_reports_unknown_accuracy() {
        let resolver = GeolocationResolver::new(PositionOptions::default());
        let provider = ReportedGeolocation::new(Some(GeolocationReport {
            status: GeolocationStatus::Granted,
            latitude: Some(52.52),
            longitude: Some(13.405),
            accuracy: None,
        }));
        let location = resolver
            .resolve(&provider, || async { IpInfo::failed() })
            .await;
        assert_eq!(location.latitude, "52.520000");
        assert_eq!(location.longitude, "13.405000");
        assert_eq!(location.accuracy, "Unknown");
    }
}
