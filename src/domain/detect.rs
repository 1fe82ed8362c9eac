//! Device, OS, browser and network classifiers.
//!
//! Each classifier is a first-match-wins rule list over browser-exposed
//! identification strings. Rule order is part of the behavior: a user agent
//! that satisfies both the mobile and the tablet rule is Mobile.

use std::sync::LazyLock;

use regex::Regex;

use super::snapshot::{BrowserInfo, DeviceType, OsKind};
use super::types::{ClientSignals, ConnectionInfo, Variant, UNKNOWN};

static MOBILE_OR_ANDROID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Mobi|Android").expect("static regex"));
static MOBI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Mobi").expect("static regex"));
static TABLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Tablet|iPad").expect("static regex"));

static EDGE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Edg/([\d.]+)").expect("static regex"));
static CHROME_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Chrome/([\d.]+)").expect("static regex"));
static FIREFOX_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Firefox/([\d.]+)").expect("static regex"));
static SAFARI_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version/([\d.]+)").expect("static regex"));

/// Inputs to the device-type rules.
#[derive(Debug, Clone, Copy)]
pub struct DeviceHints<'a> {
    pub user_agent: &'a str,
    pub max_touch_points: u32,
    pub pointer_fine: bool,
    pub screen_width: u32,
}

impl<'a> From<&'a ClientSignals> for DeviceHints<'a> {
    fn from(signals: &'a ClientSignals) -> Self {
        Self {
            user_agent: signals.user_agent.as_deref().unwrap_or(UNKNOWN),
            max_touch_points: signals.max_touch_points.unwrap_or(0),
            pointer_fine: signals.pointer_fine.unwrap_or(false),
            screen_width: signals.screen_width.unwrap_or(0),
        }
    }
}

pub fn device_type(hints: &DeviceHints<'_>, variant: Variant) -> DeviceType {
    let ua = hints.user_agent;

    if MOBILE_OR_ANDROID.is_match(ua) {
        return DeviceType::Mobile;
    }
    if TABLET.is_match(ua)
        || (hints.max_touch_points > 1 && !MOBI.is_match(ua) && !hints.pointer_fine)
    {
        return DeviceType::Tablet;
    }

    match variant {
        Variant::Dashboard => {
            if hints.pointer_fine && hints.screen_width > 1440 {
                return DeviceType::Desktop;
            }
            if hints.pointer_fine {
                return DeviceType::Laptop;
            }
        }
        Variant::Login => {
            // touch-capable machines with a mouse are laptops here, checked
            // before the wide-screen desktop rule
            if hints.pointer_fine && hints.max_touch_points > 0 {
                return DeviceType::Laptop;
            }
            if hints.pointer_fine && hints.screen_width > 1440 {
                return DeviceType::Desktop;
            }
        }
    }

    DeviceType::Unknown
}

/// Platform string wins over the user agent, so an Android phone reporting
/// `Linux armv8l` is Linux.
pub fn os(platform: &str, user_agent: &str) -> OsKind {
    if platform.contains("Win") {
        OsKind::Windows
    } else if platform.contains("Mac") {
        OsKind::MacOs
    } else if platform.contains("Linux") {
        OsKind::Linux
    } else if user_agent.contains("Android") {
        OsKind::Android
    } else if user_agent.contains("like Mac OS X") {
        OsKind::Ios
    } else {
        OsKind::Unknown
    }
}

pub fn browser(user_agent: &str) -> BrowserInfo {
    let (name, pattern) = if user_agent.contains("Edg") {
        ("Edge", &*EDGE_VERSION)
    } else if user_agent.contains("Chrome") {
        ("Chrome", &*CHROME_VERSION)
    } else if user_agent.contains("Firefox") {
        ("Firefox", &*FIREFOX_VERSION)
    } else if user_agent.contains("Safari") {
        ("Safari", &*SAFARI_VERSION)
    } else {
        return BrowserInfo::unknown();
    };

    let version = pattern
        .captures(user_agent)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    BrowserInfo {
        name: name.to_string(),
        version,
    }
}

/// Classify `navigator.connection`. Without connection info the answer is
/// "Unknown"; nothing else is used to guess.
pub fn network_type(connection: Option<&ConnectionInfo>, variant: Variant) -> String {
    let Some(conn) = connection else {
        return UNKNOWN.to_string();
    };
    let fast = conn.downlink.is_some_and(|d| d > 1.0);

    match variant {
        Variant::Dashboard => match conn.effective_type.as_str() {
            "slow-2g" | "2g" => "2G (Mobile Data)".to_string(),
            "3g" => "3G (Mobile Data)".to_string(),
            "4g" if fast => "5G".to_string(),
            "4g" => "4G".to_string(),
            _ => "WiFi".to_string(),
        },
        Variant::Login => {
            let medium = if fast { "WiFi" } else { "Mobile Data" };
            let speed = match conn.effective_type.as_str() {
                "slow-2g" | "2g" => "2G",
                "3g" => "3G",
                "4g" if fast => "5G",
                "4g" => "4G",
                _ => UNKNOWN,
            };
            format!("{} ({})", medium, speed)
        }
    }
}

/// `"W x H"`, or "Unknown" when either dimension was not reported.
pub fn screen_resolution(width: Option<u32>, height: Option<u32>) -> String {
    match (width, height) {
        (Some(w), Some(h)) => format!("{} x {}", w, h),
        _ => UNKNOWN.to_string(),
    }
}
