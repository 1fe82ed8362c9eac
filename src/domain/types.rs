use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

/// Placeholder for any value that could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Outcome of asking an optional runtime capability for a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability<T> {
    Success(T),
    Denied,
    TimedOut,
    Unsupported,
}

impl<T> Capability<T> {
    pub fn label(&self) -> &'static str {
        match self {
            Capability::Success(_) => "success",
            Capability::Denied => "denied",
            Capability::TimedOut => "timed_out",
            Capability::Unsupported => "unsupported",
        }
    }
}

/// Which flavour of the collector runs: the dashboard page or the
/// post-login summary. Selects rule lists, labels, lookup endpoint and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Dashboard,
    Login,
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dashboard" => Ok(Variant::Dashboard),
            "login" => Ok(Variant::Login),
            other => bail!("unknown variant '{}' (expected 'dashboard' or 'login')", other),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Dashboard => write!(f, "dashboard"),
            Variant::Login => write!(f, "login"),
        }
    }
}

/// Browser-exposed identification and capability values for one visit.
///
/// Everything is optional: an absent value ends up as an "Unknown"
/// sentinel in the snapshot, never as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSignals {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub max_touch_points: Option<u32>,
    /// `matchMedia('(pointer:fine)')`
    pub pointer_fine: Option<bool>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub timezone: Option<String>,
    pub local_time: Option<String>,
    pub connection: Option<ConnectionInfo>,
    pub geolocation: Option<GeolocationReport>,
    #[graphql(default)]
    pub ice_candidates: Vec<String>,
    /// Host the page was served from (selects the loopback lookup endpoint).
    pub origin_host: Option<String>,
}

/// `navigator.connection`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, InputObject)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionInfo {
    pub effective_type: String,
    pub downlink: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationStatus {
    Granted,
    Denied,
    TimedOut,
    Unsupported,
}

/// What the browser observed when it asked for a position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct GeolocationReport {
    pub status: GeolocationStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters, when the fix reports it.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct DaemonHealth {
    pub version: String,
    pub uptime_secs: u64,
    pub variant: Variant,
    pub snapshot_ready: bool,
}
