//! Collaborator contracts for time queries and clock corrections.
//!
//! The engine never speaks the time protocol itself and never touches the
//! OS clock directly. Both concerns sit behind traits so deployments can
//! inject real implementations while tests inject scripted ones.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, trace};

use crate::ProbeErrorKind;

/// One successful reading from a time-reference server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReading {
    /// Round-trip delay of the query in milliseconds.
    pub round_trip_ms: f64,

    /// Estimated local-clock offset against the reference in milliseconds.
    pub offset_ms: f64,
}

/// Failure of a single probe. Recovered locally; drives server status.
#[derive(Debug)]
pub enum ProbeError {
    Timeout,
    Unreachable(String),
    Protocol(String),
}

impl ProbeError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            ProbeError::Timeout => ProbeErrorKind::Timeout,
            ProbeError::Unreachable(_) => ProbeErrorKind::Unreachable,
            ProbeError::Protocol(_) => ProbeErrorKind::ProtocolError,
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout => write!(f, "query timed out"),
            ProbeError::Unreachable(msg) => write!(f, "server unreachable: {}", msg),
            ProbeError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Failure of a clock correction attempt.
#[derive(Debug)]
pub enum CorrectionError {
    /// The process lacks the privilege to set the system clock.
    /// Retrying cannot succeed.
    PermissionDenied,

    /// Transient failure; eligible for retry with backoff.
    Failed(String),
}

impl fmt::Display for CorrectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionError::PermissionDenied => {
                write!(f, "administrative privileges required to set the clock")
            }
            CorrectionError::Failed(msg) => write!(f, "clock correction failed: {}", msg),
        }
    }
}

impl std::error::Error for CorrectionError {}

/// Queries a time-reference server for delay and offset.
#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn query(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ProbeReading, ProbeError>;
}

/// Applies a correction to the local system clock.
#[async_trait]
pub trait ClockControl: Send + Sync {
    async fn apply_correction(&self, offset_ms: f64) -> Result<(), CorrectionError>;
}

/// Simulated time source for the bundled binary and demos.
///
/// Produces plausible readings with configurable jitter. Real deployments
/// inject a protocol-speaking implementation instead.
pub struct SimTimeSource {
    base_response_ms: f64,
    base_offset_ms: f64,
    jitter_ms: f64,
}

impl SimTimeSource {
    pub fn new(base_response_ms: f64, base_offset_ms: f64, jitter_ms: f64) -> Self {
        Self {
            base_response_ms,
            base_offset_ms,
            jitter_ms,
        }
    }
}

impl Default for SimTimeSource {
    fn default() -> Self {
        Self::new(25.0, 2.0, 10.0)
    }
}

#[async_trait]
impl TimeSource for SimTimeSource {
    async fn query(
        &self,
        host: &str,
        port: u16,
        _timeout: Duration,
    ) -> Result<ProbeReading, ProbeError> {
        let (response, offset) = {
            let mut rng = rand::thread_rng();
            (
                self.base_response_ms + rng.gen_range(0.0..=self.jitter_ms),
                self.base_offset_ms + rng.gen_range(-self.jitter_ms..=self.jitter_ms),
            )
        };
        trace!("simulated reading for {host}:{port}: {response:.1}ms / {offset:.1}ms offset");
        Ok(ProbeReading {
            round_trip_ms: response,
            offset_ms: offset,
        })
    }
}

/// Clock control that only logs the corrections it would apply.
///
/// Used by the bundled binary so the engine can run end to end without
/// touching the system clock.
pub struct LoggingClock;

#[async_trait]
impl ClockControl for LoggingClock {
    async fn apply_correction(&self, offset_ms: f64) -> Result<(), CorrectionError> {
        info!("dry-run clock correction: would adjust local clock by {offset_ms:.1}ms");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_error_kinds_map() {
        assert_eq!(ProbeError::Timeout.kind(), ProbeErrorKind::Timeout);
        assert_eq!(
            ProbeError::Unreachable("no route".into()).kind(),
            ProbeErrorKind::Unreachable
        );
        assert_eq!(
            ProbeError::Protocol("bad packet".into()).kind(),
            ProbeErrorKind::ProtocolError
        );
    }

    #[tokio::test]
    async fn sim_source_stays_within_jitter() {
        let source = SimTimeSource::new(20.0, 0.0, 5.0);
        let reading = source
            .query("example.org", 123, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(reading.round_trip_ms >= 20.0 && reading.round_trip_ms <= 25.0);
        assert!(reading.offset_ms.abs() <= 5.0);
    }

    #[tokio::test]
    async fn logging_clock_always_succeeds() {
        assert!(LoggingClock.apply_correction(42.0).await.is_ok());
    }
}
