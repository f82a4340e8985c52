//! ==============================================================================
//! domain.rs - telemetry data model shared by the sampler, store and api
//! ==============================================================================
//!
//! purpose:
//!     defines the latest-known device state (Snapshot), the link status
//!     classification and the entries kept in the event log.
//!
//! relationships:
//!     - built by: sampler.rs (normalizes a device Reading into a Snapshot)
//!     - owned by: store.rs (single current snapshot, log store)
//!     - serialized by: api.rs (flat json object for the ui)
//!
//! ==============================================================================

use chrono::{DateTime, Local, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// obstruction above this percentage counts as a degraded link
pub const OBSTRUCTION_THRESHOLD_PCT: f64 = 5.0;

// ==============================================================================
// link status
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// no tick has completed yet
    Connecting,
    Online,
    OnlineObstructed,
    /// dish answering but not carrying traffic, sky partly blocked
    Obstructed,
    /// dish answering, no traffic, no obstruction
    Idle,
    /// the last device read failed
    Disconnected,
}

impl LinkStatus {
    /// classify a successful reading
    ///
    /// a link carrying traffic (any download or a measured ping) is online,
    /// flagged obstructed above the threshold. a quiet link with some
    /// obstruction is obstructed, otherwise idle.
    pub fn classify(down_mbps: f64, ping_ms: f64, obstructed_pct: f64) -> Self {
        if down_mbps > 0.0 || ping_ms > 0.0 {
            if obstructed_pct > OBSTRUCTION_THRESHOLD_PCT {
                LinkStatus::OnlineObstructed
            } else {
                LinkStatus::Online
            }
        } else if obstructed_pct > 0.0 {
            LinkStatus::Obstructed
        } else {
            LinkStatus::Idle
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(
            self,
            LinkStatus::OnlineObstructed
                | LinkStatus::Obstructed
                | LinkStatus::Idle
                | LinkStatus::Disconnected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkStatus::Connecting => "Connecting...",
            LinkStatus::Online => "Online",
            LinkStatus::OnlineObstructed => "Online (Obstructed)",
            LinkStatus::Obstructed => "Obstructed",
            LinkStatus::Idle => "Idle",
            LinkStatus::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LinkStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ==============================================================================
// snapshot
// ==============================================================================
// replaced wholesale every tick, never mutated in place once committed.
// field names on the wire match what the dashboard ui already reads.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub online: bool,
    #[serde(rename = "status_text")]
    pub status: LinkStatus,
    #[serde(rename = "uptime_s")]
    pub uptime_seconds: u64,
    #[serde(rename = "down")]
    pub download_mbps: f64,
    #[serde(rename = "up")]
    pub upload_mbps: f64,
    #[serde(rename = "ping")]
    pub ping_ms: f64,
    /// always within 0-100
    pub obstructed_pct: f64,
    #[serde(rename = "hardware")]
    pub hardware_version: String,
    #[serde(rename = "software")]
    pub software_version: String,
    #[serde(rename = "gps_sats")]
    pub gps_satellites: u32,
    #[serde(rename = "eth_speed")]
    pub ethernet_speed_mbps: u32,
    #[serde(rename = "heater")]
    pub heater_state: String,
    #[serde(rename = "azimuth")]
    pub azimuth_deg: f64,
    #[serde(rename = "elevation")]
    pub elevation_deg: f64,
    #[serde(rename = "tilt")]
    pub tilt_deg: f64,
    pub sampled_at: DateTime<Utc>,
}

impl Snapshot {
    /// placeholder published before the first tick completes
    pub fn connecting() -> Self {
        Self {
            online: false,
            status: LinkStatus::Connecting,
            uptime_seconds: 0,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            ping_ms: 0.0,
            obstructed_pct: 0.0,
            hardware_version: "--".to_string(),
            software_version: "--".to_string(),
            gps_satellites: 0,
            ethernet_speed_mbps: 0,
            heater_state: "--".to_string(),
            azimuth_deg: 0.0,
            elevation_deg: 0.0,
            tilt_deg: 0.0,
            sampled_at: Utc::now(),
        }
    }

    /// copy of this snapshot marked as unreachable
    ///
    /// identity and last telemetry are kept so the ui still shows what the
    /// dish reported before it went away.
    pub fn disconnected(&self, at: DateTime<Utc>) -> Self {
        Self {
            online: false,
            status: LinkStatus::Disconnected,
            sampled_at: at,
            ..self.clone()
        }
    }
}

// ==============================================================================
// log entries
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    #[serde(serialize_with = "serialize_local_time")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// log viewer shows wall-clock time of the machine running the dashboard
fn serialize_local_time<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    let local: DateTime<Local> = ts.with_timezone(&Local);
    serializer.collect_str(&local.format("%Y-%m-%d %H:%M:%S"))
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_traffic_is_online() {
        assert_eq!(LinkStatus::classify(450.2, 25.0, 0.3), LinkStatus::Online);
        // ping alone is enough to call the link up
        assert_eq!(LinkStatus::classify(0.0, 31.0, 0.0), LinkStatus::Online);
    }

    #[test]
    fn test_classify_obstruction_threshold() {
        assert_eq!(LinkStatus::classify(10.0, 30.0, 5.0), LinkStatus::Online);
        assert_eq!(LinkStatus::classify(10.0, 30.0, 5.1), LinkStatus::OnlineObstructed);
        assert_eq!(LinkStatus::classify(0.0, 0.0, 0.5), LinkStatus::Obstructed);
        assert_eq!(LinkStatus::classify(0.0, 0.0, 0.0), LinkStatus::Idle);
    }

    #[test]
    fn test_degraded_states() {
        assert!(!LinkStatus::Online.is_degraded());
        assert!(!LinkStatus::Connecting.is_degraded());
        assert!(LinkStatus::OnlineObstructed.is_degraded());
        assert!(LinkStatus::Disconnected.is_degraded());
    }

    #[test]
    fn test_snapshot_wire_names() {
        let json = serde_json::to_value(Snapshot::connecting()).unwrap();
        for key in [
            "online", "status_text", "uptime_s", "up", "down", "ping", "obstructed_pct",
            "hardware", "software", "gps_sats", "eth_speed", "heater", "azimuth",
            "elevation", "tilt", "sampled_at",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json["status_text"], "Connecting...");
        assert_eq!(json["hardware"], "--");
    }

    #[test]
    fn test_disconnected_keeps_identity() {
        let mut snap = Snapshot::connecting();
        snap.online = true;
        snap.status = LinkStatus::Online;
        snap.hardware_version = "rev3_proto2".to_string();

        let down = snap.disconnected(Utc::now());
        assert!(!down.online);
        assert_eq!(down.status, LinkStatus::Disconnected);
        assert_eq!(down.hardware_version, "rev3_proto2");
    }

    #[test]
    fn test_log_entry_serialization() {
        let entry = LogEntry::warn("Link status changed: Online -> Obstructed");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "WARN");
        assert_eq!(json["message"], "Link status changed: Online -> Obstructed");
        // %Y-%m-%d %H:%M:%S
        assert_eq!(json["timestamp"].as_str().unwrap().len(), 19);
    }
}
