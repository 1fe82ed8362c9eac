//! Private-IP resolver.
//!
//! Host-local addresses surface as a side effect of peer-connection candidate
//! gathering; no connection to a remote peer is ever made. The resolver takes
//! the first candidate carrying an IPv4 address and gives up after a short
//! fixed timeout.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

use super::types::UNKNOWN;

/// A stream of ICE-style candidate lines
/// (`candidate:<foundation> <component> <proto> <priority> <address> <port> typ <type> ...`).
#[async_trait]
pub trait CandidateSource: Send {
    /// Next candidate, or `None` once gathering is complete.
    async fn next_candidate(&mut self) -> Option<String>;

    /// Release the underlying negotiation resource.
    fn close(&mut self);
}

/// Candidate lines gathered by the browser page and posted with the signals.
pub struct ReportedCandidates {
    pending: VecDeque<String>,
    closed: bool,
}

impl ReportedCandidates {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            pending: candidates.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl CandidateSource for ReportedCandidates {
    async fn next_candidate(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        self.pending.pop_front()
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}

/// Local host candidate for this machine: a UDP socket is "connected"
/// toward `target` so the kernel picks the outbound interface. Connecting a
/// UDP socket sends nothing.
pub struct UdpProbe {
    target: SocketAddr,
    socket: Option<UdpSocket>,
    gathered: bool,
}

impl UdpProbe {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            socket: None,
            gathered: false,
        }
    }
}

#[async_trait]
impl CandidateSource for UdpProbe {
    async fn next_candidate(&mut self) -> Option<String> {
        if self.gathered {
            return None;
        }
        self.gathered = true;

        let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "binding probe socket failed");
                return None;
            }
        };
        if let Err(e) = socket.connect(self.target).await {
            debug!(error = %e, target = %self.target, "no route for probe socket");
            return None;
        }
        let local = socket.local_addr().ok()?;
        self.socket = Some(socket);

        Some(format!(
            "candidate:0 1 udp 2122260223 {} {} typ host",
            local.ip(),
            local.port()
        ))
    }

    fn close(&mut self) {
        self.socket.take();
    }
}

/// The address token (fifth field) of a candidate line, if it is IPv4.
pub fn parse_candidate(candidate: &str) -> Option<Ipv4Addr> {
    candidate.split(' ').nth(4)?.parse().ok()
}

pub struct PrivateIpResolver {
    timeout: Duration,
}

impl PrivateIpResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// First IPv4 host candidate, or "Unknown" when none arrives in time.
    /// The source is closed either way.
    pub async fn resolve(&self, source: &mut dyn CandidateSource) -> String {
        let found = tokio::time::timeout(self.timeout, first_ipv4(source)).await;
        source.close();

        match found {
            Ok(Some(ip)) => ip.to_string(),
            Ok(None) => {
                debug!("candidate gathering finished without an IPv4 host address");
                UNKNOWN.to_string()
            }
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "private IP lookup timed out");
                UNKNOWN.to_string()
            }
        }
    }
}

async fn first_ipv4(source: &mut dyn CandidateSource) -> Option<Ipv4Addr> {
    while let Some(candidate) = source.next_candidate().await {
        if let Some(ip) = parse_candidate(&candidate) {
            return Some(ip);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Never produces a candidate; records whether it was closed.
    struct Silent {
        closed: bool,
    }

    #[async_trait]
    impl CandidateSource for Silent {
        async fn next_candidate(&mut self) -> Option<String> {
            std::future::pending().await
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn parses_ipv4_host_candidates_only() {
        assert_eq!(
            parse_candidate("candidate:842163049 1 udp 1677729535 192.168.1.34 56143 typ host"),
            Some(Ipv4Addr::new(192, 168, 1, 34))
        );
        assert_eq!(
            parse_candidate("candidate:1 1 udp 2113937151 2b1f4c0e-7d1a.local 54321 typ host"),
            None
        );
        assert_eq!(
            parse_candidate("candidate:2 1 udp 2113937151 fe80::1 54321 typ host"),
            None
        );
        assert_eq!(parse_candidate("garbage"), None);
    }

    #[tokio::test]
    async fn first_ipv4_candidate_wins() {
        let mut source = ReportedCandidates::new(vec![
            "candidate:1 1 udp 2113937151 2b1f4c0e-7d1a.local 54321 typ host".into(),
            "candidate:2 1 udp 2113937151 10.0.0.12 54322 typ host".into(),
            "candidate:3 1 udp 2113937151 10.0.0.99 54323 typ host".into(),
        ]);
        let ip = PrivateIpResolver::new(Duration::from_secs(1))
            .resolve(&mut source)
            .await;
        assert_eq!(ip, "10.0.0.12");
        // closed: the remaining candidate is discarded
        assert_eq!(source.next_candidate().await, None);
    }

    #[tokio::test]
    async fn no_usable_candidate_is_unknown() {
        let mut source = ReportedCandidates::new(Vec::new());
        let ip = PrivateIpResolver::new(Duration::from_secs(1))
            .resolve(&mut source)
            .await;
        assert_eq!(ip, "Unknown");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_unknown_and_closes_source() {
        let mut source = Silent { closed: false };
        let ip = PrivateIpResolver::new(Duration::from_secs(1))
            .resolve(&mut source)
            .await;
        assert_eq!(ip, "Unknown");
        assert!(source.closed);
    }

    #[tokio::test]
    async fn udp_probe_reports_a_loopback_host_candidate() {
        let mut probe = UdpProbe::new("127.0.0.1:9".parse().unwrap());
        let candidate = probe.next_candidate().await.expect("loopback route");
        assert_eq!(parse_candidate(&candidate), Some(Ipv4Addr::LOCALHOST));
        assert_eq!(probe.next_candidate().await, None);
        probe.close();
    }
}
