//! ==============================================================================
//! error.rs - why a sampling tick can fail
//! ==============================================================================
//!
//! purpose:
//!     the recoverable failure taxonomy of the sampler.
//!     the display text is what lands in the log store as "Poll error: ...".
//!
//! relationships:
//!     - returned by: device.rs (DeviceClient::read) and sampler.rs (normalize)
//!     - recorded by: sampler.rs (one ERROR entry per failed tick)
//!
//! ==============================================================================

use thiserror::Error;

/// why a sampling tick produced no reading
///
/// both variants are recovered inside the sampler: they become an ERROR log
/// entry and an offline snapshot, never a stopped timer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    /// timeout, refused connection or http failure talking to the terminal
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    /// the terminal answered but the data failed validation
    #[error("malformed reading: {0}")]
    MalformedReading(String),
}

impl SampleError {
    pub fn unreachable(reason: impl Into<String>) -> Self {
        SampleError::DeviceUnreachable(reason.into())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        SampleError::MalformedReading(reason.into())
    }
}
