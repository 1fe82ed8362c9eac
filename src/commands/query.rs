//! `nectar query`: query a nectar daemon via its REST API.

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use crate::client::NectarClient;
use crate::config;
use crate::domain::types::ClientSignals;

#[derive(Subcommand)]
pub enum QueryCommands {
    /// Daemon health check
    Health,
    /// Current environment snapshot
    Snapshot,
    /// Run a collection cycle with this CLI as the client
    Collect,
}

pub fn run(
    url: Option<&str>,
    format: &str,
    config_path: Option<&str>,
    command: &QueryCommands,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(url, format, config_path, command))
}

async fn run_async(
    url: Option<&str>,
    format: &str,
    config_path: Option<&str>,
    command: &QueryCommands,
) -> Result<()> {
    let cfg = config::load(config_path.map(Path::new))?;
    let client = NectarClient::new(url.unwrap_or(&cfg.daemon_url))?;

    match command {
        QueryCommands::Health => {
            let data = client.health().await?;
            print_output(format, &data)
        }
        QueryCommands::Snapshot => {
            let data = client.snapshot().await?;
            print_output(format, &data)
        }
        QueryCommands::Collect => {
            let signals = ClientSignals {
                user_agent: Some(format!("nectar/{}", env!("CARGO_PKG_VERSION"))),
                ..ClientSignals::default()
            };
            let data = client.collect(&signals).await?;
            print_output(format, &data)
        }
    }
}

fn print_output<T: serde::Serialize>(format: &str, data: &T) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{}", json);
        }
        _ => {
            let value = serde_json::to_value(data)?;
            print_value(&value, 0);
        }
    }
    Ok(())
}

/// Nested key/value listing; snapshots only nest objects and scalars.
fn print_value(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                if val.is_object() {
                    println!("{}{}:", pad, key);
                    print_value(val, indent + 1);
                } else {
                    println!("{}{}: {}", pad, key, format_scalar(val));
                }
            }
        }
        other => println!("{}{}", pad, format_scalar(other)),
    }
}

fn format_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
