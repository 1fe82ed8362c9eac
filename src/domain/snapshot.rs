//! Environment snapshot: one fully populated collection of device, browser,
//! network and location attributes.
//!
//! A snapshot is built once per collection cycle and never mutated; a new
//! cycle replaces it wholesale.

use std::fmt;

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Variant, UNKNOWN};

/// Public IP shown when the lookup service could not be reached.
pub const FAILED_TO_FETCH: &str = "Failed to fetch";

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct EnvironmentSnapshot {
    pub device_type: DeviceType,
    pub os: OsKind,
    pub browser: BrowserInfo,
    pub screen_resolution: String,
    pub timezone: String,
    pub local_time: String,
    pub network_type: String,
    pub public_ip: String,
    pub private_ip: String,
    pub geo: GeoInfo,
    pub location: LocationInfo,
    pub login_timestamp: DateTime<Utc>,
    pub session_id: String,
    pub variant: Variant,
}

impl EnvironmentSnapshot {
    /// Attribute/value rows in presentation order for this snapshot's variant.
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Device Type", self.device_type.to_string()),
            ("Operating System", self.os.to_string()),
            ("Browser", format!("{} {}", self.browser.name, self.browser.version)),
            ("Screen Resolution", self.screen_resolution.clone()),
            ("Timezone", self.timezone.clone()),
            ("Local Time", self.local_time.clone()),
        ];

        match self.variant {
            Variant::Dashboard => rows.extend([
                ("Private IP", self.private_ip.clone()),
                ("Public IP", self.public_ip.clone()),
                ("City", self.geo.city.clone()),
                ("Region", self.geo.region.clone()),
                ("Country", self.geo.country.clone()),
                ("Network Type", self.network_type.clone()),
                ("ISP", self.geo.isp.clone()),
            ]),
            Variant::Login => rows.extend([
                ("Public IP", self.public_ip.clone()),
                ("Network Type", self.network_type.clone()),
            ]),
        }

        rows.extend([
            ("Login Timestamp", self.login_timestamp.to_rfc3339()),
            ("Session ID", self.session_id.clone()),
            ("Location", self.location.to_string()),
        ]);
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Laptop,
    Desktop,
    Unknown,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceType::Mobile => "Mobile",
            DeviceType::Tablet => "Tablet",
            DeviceType::Laptop => "Laptop",
            DeviceType::Desktop => "Desktop",
            DeviceType::Unknown => UNKNOWN,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
pub enum OsKind {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    Linux,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    Unknown,
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OsKind::Windows => "Windows",
            OsKind::MacOs => "macOS",
            OsKind::Linux => "Linux",
            OsKind::Android => "Android",
            OsKind::Ios => "iOS",
            OsKind::Unknown => UNKNOWN,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

impl BrowserInfo {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            version: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct GeoInfo {
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
}

/// Normalized result of one public-IP lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfo {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
}

impl IpInfo {
    /// The record substituted for any failed lookup.
    pub fn failed() -> Self {
        Self {
            ip: FAILED_TO_FETCH.to_string(),
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
        }
    }

    pub fn geo(&self) -> GeoInfo {
        GeoInfo {
            city: self.city.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
            isp: self.isp.clone(),
        }
    }
}

/// Latitude/longitude as display strings, or "Unknown" with a textual
/// IP-based description in `accuracy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct LocationInfo {
    pub latitude: String,
    pub longitude: String,
    pub accuracy: String,
}

impl fmt::Display for LocationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lat: {}, Lng: {} (Accuracy: {})",
            self.latitude, self.longitude, self.accuracy
        )
    }
}
