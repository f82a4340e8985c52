//! ==============================================================================
//! sampler.rs - periodic telemetry sampler
//! ==============================================================================
//!
//! purpose:
//!     the only writer of the snapshot and the history windows. once per
//!     interval it asks the device client for a reading and publishes the
//!     result to the state store.
//!
//! per tick:
//!     - success: normalize the reading, log a status transition if the
//!       classification changed, push (down, up) to history and swap in the
//!       new snapshot
//!     - failure (error, timeout, malformed data): re-publish the previous
//!       snapshot as disconnected and append one ERROR entry. history is left
//!       alone so an outage never shows up as fake zero throughput.
//!
//! scheduling:
//!     ticks run one at a time on a tokio interval. a tick that overruns the
//!     period makes the interval skip the missed slots instead of bursting.
//!
//! relationships:
//!     - reads from: device.rs (DeviceClient)
//!     - writes to: store.rs (StateStore)
//!     - spawned by: main.rs
//!
//! ==============================================================================

use crate::device::{DeviceClient, Reading};
use crate::domain::{LinkStatus, LogEntry, Snapshot};
use crate::error::SampleError;
use crate::store::StateStore;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub struct Sampler {
    client: Arc<dyn DeviceClient>,
    store: StateStore,
    period: Duration,
    timeout: Duration,
    show_samples: bool,
    last_status: LinkStatus,
}

impl Sampler {
    pub fn new(
        client: Arc<dyn DeviceClient>,
        store: StateStore,
        period: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            store,
            period,
            timeout,
            show_samples: false,
            last_status: LinkStatus::Connecting,
        }
    }

    /// log every poll at info level
    pub fn show_samples(mut self, on: bool) -> Self {
        self.show_samples = on;
        self
    }

    /// sample forever at the configured period
    pub async fn run(mut self) {
        info!(
            client = self.client.name(),
            period_ms = self.period.as_millis() as u64,
            "sampler started"
        );
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// one complete sampling step; returns the status that was committed
    pub async fn tick(&mut self) -> LinkStatus {
        let now = Utc::now();
        let outcome = match tokio::time::timeout(self.timeout, self.client.read()).await {
            Ok(result) => result.and_then(|reading| normalize(&reading, now)),
            Err(_) => Err(SampleError::unreachable(format!(
                "no answer within {} ms",
                self.timeout.as_millis()
            ))),
        };

        let status = match outcome {
            Ok(snapshot) => self.commit_success(snapshot).await,
            Err(e) => self.commit_failure(e, now).await,
        };
        self.last_status = status;
        status
    }

    async fn commit_success(&self, snapshot: Snapshot) -> LinkStatus {
        let status = snapshot.status;

        if status != self.last_status {
            let message = format!("Link status changed: {} -> {}", self.last_status, status);
            if status.is_degraded() {
                warn!("{}", message);
                self.store.append_log(LogEntry::warn(message)).await;
            } else {
                info!("{}", message);
                self.store.append_log(LogEntry::info(message)).await;
            }
        }

        if self.show_samples {
            info!(
                "Polled: {} - {:.1}/{:.1} Mbps",
                status, snapshot.download_mbps, snapshot.upload_mbps
            );
        } else {
            debug!(
                "Polled: {} - {:.1}/{:.1} Mbps",
                status, snapshot.download_mbps, snapshot.upload_mbps
            );
        }

        self.store.commit_sample(snapshot).await;
        status
    }

    async fn commit_failure(&self, err: SampleError, at: DateTime<Utc>) -> LinkStatus {
        error!(client = self.client.name(), "poll failed: {}", err);

        let previous = self.store.snapshot().await;
        self.store.commit_snapshot(previous.disconnected(at)).await;
        self.store
            .append_log(LogEntry::error(format!("Poll error: {}", err)))
            .await;
        LinkStatus::Disconnected
    }
}

// ==============================================================================
// normalization - raw reading -> snapshot
// ==============================================================================

/// validate a reading and turn it into a snapshot
///
/// any missing field or non-finite number rejects the whole reading.
/// obstruction is clamped to 0-100.
pub fn normalize(reading: &Reading, sampled_at: DateTime<Utc>) -> Result<Snapshot, SampleError> {
    let download_mbps = non_negative(required(reading.downlink_mbps, "downlink")?, "downlink")?;
    let upload_mbps = non_negative(required(reading.uplink_mbps, "uplink")?, "uplink")?;
    let ping_ms = non_negative(required(reading.ping_ms, "ping")?, "ping")?;
    let obstructed_pct = finite(required(reading.obstructed_pct, "obstruction")?, "obstruction")?
        .clamp(0.0, 100.0);
    let uptime = non_negative(required(reading.uptime_s, "uptime")?, "uptime")?;

    let status = LinkStatus::classify(download_mbps, ping_ms, obstructed_pct);

    Ok(Snapshot {
        online: true,
        status,
        uptime_seconds: uptime as u64,
        download_mbps,
        upload_mbps,
        ping_ms,
        obstructed_pct,
        hardware_version: required(reading.hardware_version.clone(), "hardware_version")?,
        software_version: required(reading.software_version.clone(), "software_version")?,
        gps_satellites: count(required(reading.gps_sats, "gps_sats")?, "gps_sats")?,
        ethernet_speed_mbps: count(required(reading.eth_speed_mbps, "eth_speed")?, "eth_speed")?,
        heater_state: required(reading.heater.clone(), "heater")?,
        azimuth_deg: finite(required(reading.azimuth_deg, "azimuth")?, "azimuth")?,
        elevation_deg: finite(required(reading.elevation_deg, "elevation")?, "elevation")?,
        tilt_deg: finite(required(reading.tilt_deg, "tilt")?, "tilt")?,
        sampled_at,
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, SampleError> {
    value.ok_or_else(|| SampleError::malformed(format!("missing {}", field)))
}

fn finite(value: f64, field: &str) -> Result<f64, SampleError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SampleError::malformed(format!("{} is not finite: {}", field, value)))
    }
}

fn non_negative(value: f64, field: &str) -> Result<f64, SampleError> {
    let value = finite(value, field)?;
    if value < 0.0 {
        return Err(SampleError::malformed(format!("{} is negative: {}", field, value)));
    }
    Ok(value)
}

fn count(value: i64, field: &str) -> Result<u32, SampleError> {
    u32::try_from(value)
        .map_err(|_| SampleError::malformed(format!("{} out of range: {}", field, value)))
}
