//! ==============================================================================
//! device.rs - device client boundary (the satellite terminal)
//! ==============================================================================
//!
//! purpose:
//!     the sampler only needs one thing from the terminal: "give me a reading
//!     or tell me why you can't". this module defines that contract and two
//!     implementations of it:
//!     - DishHttpClient: fetches the dish's get_status response as json from
//!       a grpc-to-http bridge (the dish itself does not serve json)
//!     - SimulatedDish: plausible fake telemetry for machines without a dish
//!
//! design:
//!     - Reading carries raw values in device units, every field optional.
//!       validation (and the decision that a missing field is fatal) happens
//!       in sampler.rs, not here.
//!     - the client picks its own transport timeout but the sampler still
//!       bounds every call with its own timeout.
//!
//! relationships:
//!     - used by: sampler.rs (holds an Arc<dyn DeviceClient>)
//!     - configured by: config.rs (DeviceConfig)
//!
//! ==============================================================================

use crate::config::{DeviceConfig, DeviceKind};
use crate::error::SampleError;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

// ==============================================================================
// reading - what a device client hands back
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    pub downlink_mbps: Option<f64>,
    pub uplink_mbps: Option<f64>,
    pub ping_ms: Option<f64>,
    /// percent of sky blocked, unclamped as reported
    pub obstructed_pct: Option<f64>,
    pub uptime_s: Option<f64>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
    pub gps_sats: Option<i64>,
    pub eth_speed_mbps: Option<i64>,
    pub heater: Option<String>,
    pub azimuth_deg: Option<f64>,
    pub elevation_deg: Option<f64>,
    pub tilt_deg: Option<f64>,
}

#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// query the terminal once
    async fn read(&self) -> Result<Reading, SampleError>;

    /// short label for logs
    fn name(&self) -> &str;
}

/// build the client selected in config
pub fn build_client(config: &DeviceConfig, timeout: Duration) -> Result<Arc<dyn DeviceClient>> {
    match config.kind {
        DeviceKind::Dish => {
            info!(url = %config.url, "using dish http client");
            Ok(Arc::new(DishHttpClient::new(&config.url, timeout)?))
        }
        DeviceKind::Simulated => {
            info!("using simulated dish (no terminal access)");
            Ok(Arc::new(SimulatedDish::new(config.base_down_mbps, config.base_up_mbps)))
        }
    }
}

// ==============================================================================
// dish http client
// ==============================================================================
// the dish answers get_status with a protobuf Response. this client expects
// the json mapping of that message with the proto field names preserved:
//
//     { "dish_get_status": {
//         "device_info": { "hardware_version": "...", "software_version": "..." },
//         "device_state": { "uptime_s": "123456" },
//         "downlink_throughput_bps": 4.5e8, ... } }
//
// proto3 json drops zero-valued scalars and 64-bit integers arrive as strings,
// so an absent scalar reads as 0 and numeric strings are accepted.
//
// a stock dish only speaks grpc (port 9200). device.url must point at a bridge
// that calls get_status and returns the json above on a plain http GET.

pub struct DishHttpClient {
    http: reqwest::Client,
    url: String,
}

impl DishHttpClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, url: url.to_string() })
    }
}

#[async_trait]
impl DeviceClient for DishHttpClient {
    async fn read(&self) -> Result<Reading, SampleError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SampleError::unreachable(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| SampleError::unreachable(e.to_string()))?;

        let doc: Value = serde_json::from_str(&body)
            .map_err(|e| SampleError::malformed(format!("invalid json: {}", e)))?;

        parse_dish_status(&doc)
    }

    fn name(&self) -> &str {
        "dish"
    }
}

/// map a get_status response (or its bare dish_get_status body) to a Reading
pub fn parse_dish_status(doc: &Value) -> Result<Reading, SampleError> {
    let status = match doc.get("dish_get_status") {
        Some(inner) => inner,
        None if doc.get("device_info").is_some() => doc,
        None => return Err(SampleError::malformed("response has no dish_get_status")),
    };
    if !status.is_object() {
        return Err(SampleError::malformed("dish_get_status is not an object"));
    }

    let device_info = status
        .get("device_info")
        .ok_or_else(|| SampleError::malformed("missing device_info"))?;
    let device_state = status
        .get("device_state")
        .ok_or_else(|| SampleError::malformed("missing device_state"))?;
    let empty = Value::Null;
    let obstruction = status.get("obstruction_stats").unwrap_or(&empty);
    let gps = status.get("gps_stats").unwrap_or(&empty);
    let alignment = status.get("alignment_stats").unwrap_or(&empty);
    let dish_config = status.get("config").unwrap_or(&empty);

    Ok(Reading {
        downlink_mbps: Some(scalar(status, "downlink_throughput_bps")? / 1_000_000.0),
        uplink_mbps: Some(scalar(status, "uplink_throughput_bps")? / 1_000_000.0),
        ping_ms: Some(scalar(status, "pop_ping_latency_ms")?),
        obstructed_pct: Some(scalar(obstruction, "fraction_obstructed")? * 100.0),
        uptime_s: Some(scalar(device_state, "uptime_s")?),
        hardware_version: text(device_info, "hardware_version"),
        software_version: text(device_info, "software_version"),
        gps_sats: Some(count_scalar(gps, "gps_sats")?),
        eth_speed_mbps: Some(count_scalar(status, "eth_speed_mbps")?),
        heater: Some(text(dish_config, "snow_melt_mode").unwrap_or_else(|| "UNKNOWN".to_string())),
        azimuth_deg: Some(scalar(status, "boresight_azimuth_deg")?),
        elevation_deg: Some(scalar(status, "boresight_elevation_deg")?),
        tilt_deg: Some(scalar(alignment, "tilt_angle_deg")?),
    })
}

/// numeric field with proto3 defaulting
fn scalar(message: &Value, key: &str) -> Result<f64, SampleError> {
    match message.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| SampleError::malformed(format!("{} out of range", key))),
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map_err(|_| SampleError::malformed(format!("{} is not numeric: {:?}", key, s))),
        Some(other) => Err(SampleError::malformed(format!("{} has unexpected type: {}", key, other))),
    }
}

/// integer field; NaN, inf and fractions are malformed, not truncated
fn count_scalar(message: &Value, key: &str) -> Result<i64, SampleError> {
    let value = scalar(message, key)?;
    if !value.is_finite() || value.fract() != 0.0 || value.abs() >= i64::MAX as f64 {
        return Err(SampleError::malformed(format!("{} is not a whole count: {}", key, value)));
    }
    Ok(value as i64)
}

fn text(message: &Value, key: &str) -> Option<String> {
    message.get(key).and_then(Value::as_str).map(str::to_string)
}

// ==============================================================================
// simulated dish
// ==============================================================================

pub struct SimulatedDish {
    started: Instant,
    base_down_mbps: f64,
    base_up_mbps: f64,
}

impl SimulatedDish {
    pub fn new(base_down_mbps: f64, base_up_mbps: f64) -> Self {
        Self {
            started: Instant::now(),
            base_down_mbps,
            base_up_mbps,
        }
    }
}

#[async_trait]
impl DeviceClient for SimulatedDish {
    async fn read(&self) -> Result<Reading, SampleError> {
        // +/- 20% around the configured throughput
        let jitter = |base: f64| base * (0.8 + rand::random::<f64>() * 0.4);

        Ok(Reading {
            downlink_mbps: Some(jitter(self.base_down_mbps)),
            uplink_mbps: Some(jitter(self.base_up_mbps)),
            ping_ms: Some(20.0 + rand::random::<f64>() * 20.0),
            obstructed_pct: Some(rand::random::<f64>()),
            uptime_s: Some(self.started.elapsed().as_secs_f64()),
            hardware_version: Some("rev4_prod1".to_string()),
            software_version: Some("simulated".to_string()),
            gps_sats: Some(12),
            eth_speed_mbps: Some(1000),
            heater: Some("AUTO".to_string()),
            azimuth_deg: Some(-1.5),
            elevation_deg: Some(64.2),
            tilt_deg: Some(25.8),
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> Value {
        json!({
            "dish_get_status": {
                "device_info": {
                    "hardware_version": "rev3_proto2",
                    "software_version": "2024.05.0.mr12345"
                },
                "device_state": { "uptime_s": "86400" },
                "downlink_throughput_bps": 450200000.0,
                "uplink_throughput_bps": 120500000.0,
                "pop_ping_latency_ms": 25.0,
                "obstruction_stats": { "fraction_obstructed": 0.003 },
                "gps_stats": { "gps_sats": 14 },
                "alignment_stats": { "tilt_angle_deg": 24.9 },
                "config": { "snow_melt_mode": "ALWAYS_OFF" },
                "boresight_azimuth_deg": 12.5,
                "boresight_elevation_deg": 70.1,
                "eth_speed_mbps": 1000
            }
        })
    }

    #[test]
    fn test_parse_full_response() {
        let reading = parse_dish_status(&sample_response()).unwrap();
        assert!((reading.downlink_mbps.unwrap() - 450.2).abs() < 1e-9);
        assert!((reading.uplink_mbps.unwrap() - 120.5).abs() < 1e-9);
        assert!((reading.obstructed_pct.unwrap() - 0.3).abs() < 1e-9);
        assert_eq!(reading.uptime_s, Some(86400.0));
        assert_eq!(reading.gps_sats, Some(14));
        assert_eq!(reading.heater.as_deref(), Some("ALWAYS_OFF"));
        assert_eq!(reading.hardware_version.as_deref(), Some("rev3_proto2"));
    }

    #[test]
    fn test_bare_status_body_accepted() {
        let doc = sample_response()["dish_get_status"].clone();
        assert!(parse_dish_status(&doc).is_ok());
    }

    #[test]
    fn test_omitted_scalars_default_to_zero() {
        let doc = json!({
            "dish_get_status": {
                "device_info": { "hardware_version": "a", "software_version": "b" },
                "device_state": {}
            }
        });
        let reading = parse_dish_status(&doc).unwrap();
        assert_eq!(reading.downlink_mbps, Some(0.0));
        assert_eq!(reading.obstructed_pct, Some(0.0));
        assert_eq!(reading.heater.as_deref(), Some("UNKNOWN"));
    }

    #[test]
    fn test_missing_status_is_malformed() {
        let err = parse_dish_status(&json!({ "get_device_info": {} })).unwrap_err();
        assert!(matches!(err, SampleError::MalformedReading(_)));
    }

    #[test]
    fn test_missing_versions_left_empty() {
        let doc = json!({
            "dish_get_status": { "device_info": {}, "device_state": { "uptime_s": 5 } }
        });
        let reading = parse_dish_status(&doc).unwrap();
        assert_eq!(reading.hardware_version, None);
        assert_eq!(reading.software_version, None);
    }

    #[test]
    fn test_wrong_scalar_type_is_malformed() {
        let mut doc = sample_response();
        doc["dish_get_status"]["pop_ping_latency_ms"] = json!({ "nested": true });
        assert!(matches!(
            parse_dish_status(&doc),
            Err(SampleError::MalformedReading(_))
        ));
    }

    #[test]
    fn test_non_integer_counts_are_malformed() {
        let mut doc = sample_response();
        doc["dish_get_status"]["gps_stats"]["gps_sats"] = json!("NaN");
        assert!(matches!(
            parse_dish_status(&doc),
            Err(SampleError::MalformedReading(_))
        ));

        let mut doc = sample_response();
        doc["dish_get_status"]["eth_speed_mbps"] = json!(1000.9);
        assert!(matches!(
            parse_dish_status(&doc),
            Err(SampleError::MalformedReading(_))
        ));

        let mut doc = sample_response();
        doc["dish_get_status"]["eth_speed_mbps"] = json!("100");
        assert_eq!(parse_dish_status(&doc).unwrap().eth_speed_mbps, Some(100));
    }

    #[tokio::test]
    async fn test_simulated_reading_complete() {
        let dish = SimulatedDish::new(200.0, 20.0);
        let reading = dish.read().await.unwrap();
        let down = reading.downlink_mbps.unwrap();
        assert!((160.0..=240.0).contains(&down));
        assert!(reading.software_version.is_some());
        assert_eq!(dish.name(), "simulated");
    }

    #[tokio::test]
    async fn test_dish_client_unreachable() {
        // nothing listens on port 9 of loopback
        let client = DishHttpClient::new("http://127.0.0.1:9/status", Duration::from_millis(500)).unwrap();
        let err = client.read().await.unwrap_err();
        assert!(matches!(err, SampleError::DeviceUnreachable(_)));
    }
}
