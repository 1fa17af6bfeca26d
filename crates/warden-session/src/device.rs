//! Device fingerprinting: turning a raw `User-Agent` into something a user
//! recognizes in their device list ("Chrome 120.0.0.0 on Windows 10").
//!
//! The parse is deterministic and side-effect free. It's a heuristic over
//! well-known UA tokens, not an authority: the result is display data and
//! nothing security-relevant depends on it.

use std::fmt;

use serde::{Deserialize, Serialize};

const UNKNOWN: &str = "Unknown";

/// Broad device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
    SmartTv,
    Console,
    Wearable,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::SmartTv => "smarttv",
            Self::Console => "console",
            Self::Wearable => "wearable",
        };
        f.write_str(name)
    }
}

/// Normalized description of the device behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    /// Device model when known, otherwise the browser name.
    pub name: String,
    /// `"<os> <version>"`, e.g. `"iOS 17.2"`.
    pub os: String,
    /// `"<browser> <version>"`, e.g. `"Firefox 121.0"`.
    pub browser: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            device_type: DeviceType::Desktop,
            name: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
        }
    }
}

/// Parses a user agent into a [`DeviceInfo`].
///
/// Every field falls back independently: `desktop` for the type and
/// `"Unknown"` for the rest.
pub fn parse_user_agent(user_agent: Option<&str>) -> DeviceInfo {
    let Some(ua) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
        return DeviceInfo::default();
    };

    let browser = detect_browser(ua);
    let os = detect_os(ua);
    let device_type = detect_device_type(ua);

    let name = detect_model(ua)
        .or_else(|| browser.as_ref().map(|(name, _)| name.to_string()))
        .unwrap_or_else(|| UNKNOWN.to_string());

    DeviceInfo {
        device_type,
        name,
        os: os.map(join_version).unwrap_or_else(|| UNKNOWN.to_string()),
        browser: browser
            .map(join_version)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

/// `("Chrome", Some("120.0"))` → `"Chrome 120.0"`.
fn join_version((name, version): (&'static str, Option<String>)) -> String {
    match version {
        Some(version) if !version.is_empty() => format!("{name} {version}"),
        _ => name.to_string(),
    }
}

/// Version digits directly after `marker`, e.g. `"Chrome/"` → `"120.0.6099.71"`.
/// Underscores (iOS, macOS) are normalized to dots.
fn version_after(ua: &str, marker: &str) -> Option<String> {
    let start = ua.find(marker)? + marker.len();
    let version: String = ua[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
        .map(|c| if c == '_' { '.' } else { c })
        .collect();
    let version = version.trim_end_matches('.').to_string();
    (!version.is_empty()).then_some(version)
}

fn detect_browser(ua: &str) -> Option<(&'static str, Option<String>)> {
    // Order matters: Edge and Opera embed "Chrome/", Chrome embeds "Safari/".
    const MARKERS: &[(&str, &str)] = &[
        ("Edg/", "Edge"),
        ("EdgA/", "Edge"),
        ("EdgiOS/", "Edge"),
        ("OPR/", "Opera"),
        ("SamsungBrowser/", "Samsung Internet"),
        ("CriOS/", "Chrome"),
        ("FxiOS/", "Firefox"),
        ("Firefox/", "Firefox"),
        ("Chrome/", "Chrome"),
    ];

    for (marker, name) in MARKERS {
        if ua.contains(marker) {
            return Some((*name, version_after(ua, marker)));
        }
    }

    if ua.contains("Safari/") && ua.contains("Version/") {
        let name = if ua.contains("Mobile/") {
            "Mobile Safari"
        } else {
            "Safari"
        };
        return Some((name, version_after(ua, "Version/")));
    }
    if ua.contains("MSIE ") {
        return Some(("IE", version_after(ua, "MSIE ")));
    }
    if ua.contains("Trident/") {
        return Some(("IE", version_after(ua, "rv:")));
    }
    None
}

fn detect_os(ua: &str) -> Option<(&'static str, Option<String>)> {
    if ua.contains("Windows Phone") {
        return Some(("Windows Phone", version_after(ua, "Windows Phone ")));
    }
    if ua.contains("Windows") {
        let version = version_after(ua, "Windows NT ").map(|nt| {
            match nt.as_str() {
                "10.0" => "10",
                "6.3" => "8.1",
                "6.2" => "8",
                "6.1" => "7",
                "6.0" => "Vista",
                "5.1" | "5.2" => "XP",
                other => return other.to_string(),
            }
            .to_string()
        });
        return Some(("Windows", version));
    }
    // iOS before macOS: iPhone UAs say "like Mac OS X".
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        let version = version_after(ua, "iPhone OS ")
            .or_else(|| version_after(ua, "CPU OS "));
        return Some(("iOS", version));
    }
    if ua.contains("Mac OS X") {
        return Some(("Mac OS", version_after(ua, "Mac OS X ")));
    }
    if ua.contains("Android") {
        return Some(("Android", version_after(ua, "Android ")));
    }
    if ua.contains("CrOS") {
        return Some(("Chrome OS", None));
    }
    if ua.contains("Ubuntu") {
        return Some(("Ubuntu", None));
    }
    if ua.contains("Linux") {
        return Some(("Linux", None));
    }
    None
}

fn contains_any(ua: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| ua.contains(needle))
}

fn detect_device_type(ua: &str) -> DeviceType {
    let any = |needles: &[&str]| contains_any(ua, needles);

    if any(&["Xbox", "PlayStation", "Nintendo"]) {
        DeviceType::Console
    } else if any(&["SmartTV", "SMART-TV", "AppleTV", "GoogleTV", "BRAVIA", "Web0S", "HbbTV"]) {
        DeviceType::SmartTv
    } else if any(&["Watch OS", "watchOS", "; Watch"]) {
        DeviceType::Wearable
    } else if any(&["iPad", "Tablet"]) || (ua.contains("Android") && !ua.contains("Mobile")) {
        DeviceType::Tablet
    } else if any(&["Mobile", "iPhone", "iPod", "Windows Phone"]) {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    }
}

fn detect_model(ua: &str) -> Option<String> {
    const NAMED: &[(&str, &str)] = &[
        ("iPhone", "iPhone"),
        ("iPad", "iPad"),
        ("iPod", "iPod"),
        ("Xbox", "Xbox"),
        ("PlayStation", "PlayStation"),
        ("Nintendo", "Nintendo"),
    ];
    for (marker, name) in NAMED {
        if ua.contains(marker) {
            return Some(name.to_string());
        }
    }
    android_model(ua)
}

/// `"(Linux; Android 14; Pixel 7 Build/UQ1A)"` → `"Pixel 7"`.
fn android_model(ua: &str) -> Option<String> {
    let start = ua.find("Android")?;
    let rest = &ua[start..];
    let platform = &rest[..rest.find(')').unwrap_or(rest.len())];

    let model = platform.split(';').nth(1)?.trim();
    let model = model.split(" Build/").next().unwrap_or(model).trim();

    // Reduced UAs replace the model with "K"; WebViews append "wv".
    match model {
        "" | "K" | "wv" | "Mobile" => None,
        model => Some(model.to_string()),
    }
}
