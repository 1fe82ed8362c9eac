//! `nectar collect`: run one collection cycle on this machine and print it.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config;
use crate::domain::collector::{Capabilities, SnapshotCollector};
use crate::domain::geolocation::NoGeolocation;
use crate::domain::private_ip::UdpProbe;
use crate::domain::snapshot::EnvironmentSnapshot;
use crate::domain::types::{ClientSignals, UNKNOWN};

pub struct CollectArgs {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub screen: Option<String>,
    pub timezone: Option<String>,
    pub variant: Option<String>,
    pub format: String,
    pub config: Option<String>,
}

pub fn run(args: CollectArgs) -> Result<()> {
    init_tracing();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(args))
}

async fn run_async(args: CollectArgs) -> Result<()> {
    let mut cfg = config::load(args.config.as_deref().map(Path::new))?;
    if let Some(v) = &args.variant {
        cfg.variant = v.parse()?;
    }

    let (screen_width, screen_height) = match &args.screen {
        Some(s) => {
            let (w, h) = parse_screen(s)?;
            (Some(w), Some(h))
        }
        None => (None, None),
    };

    let signals = ClientSignals {
        user_agent: args.user_agent,
        platform: Some(args.platform.unwrap_or_else(local_platform)),
        screen_width,
        screen_height,
        timezone: args.timezone.or_else(|| std::env::var("TZ").ok()),
        ..ClientSignals::default()
    };

    let target: SocketAddr = cfg
        .collector
        .probe_target
        .parse()
        .with_context(|| format!("invalid probe_target '{}'", cfg.collector.probe_target))?;
    let mut probe = UdpProbe::new(target);

    let collector = SnapshotCollector::new(cfg.variant, &cfg.lookup, &cfg.collector)?;
    let snapshot = collector
        .collect(
            &signals,
            Capabilities {
                geolocation: &NoGeolocation,
                candidates: &mut probe,
            },
        )
        .await;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        _ => print_table(&snapshot),
    }

    Ok(())
}

/// Compact text logs on stderr; stdout carries the snapshot.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// `navigator.platform`-style name for the host OS.
fn local_platform() -> String {
    match std::env::consts::OS {
        "windows" => "Win32".to_string(),
        "macos" => "MacIntel".to_string(),
        "linux" => format!("Linux {}", std::env::consts::ARCH),
        _ => UNKNOWN.to_string(),
    }
}

fn parse_screen(s: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        bail!("screen must look like 1920x1080, got '{}'", s);
    };
    let w = w.trim().parse().with_context(|| format!("bad screen width in '{}'", s))?;
    let h = h.trim().parse().with_context(|| format!("bad screen height in '{}'", s))?;
    Ok((w, h))
}

fn print_table(snapshot: &EnvironmentSnapshot) {
    println!("{}", "═══ Environment Snapshot ═══".cyan().bold());
    let rows = snapshot.display_rows();
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        let shown = if value == UNKNOWN || value.starts_with("Failed") {
            value.dimmed().to_string()
        } else {
            value
        };
        println!("  {:<width$}  {}", label, shown, width = width);
    }
}
