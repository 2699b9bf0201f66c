//! Clock synchronization decisions and corrections.
//!
//! The decision rule is deliberately small: a correction happens exactly
//! when the measured offset magnitude exceeds the configured tolerance.
//! Corrections themselves are serialized through a lock so two cycles can
//! never adjust the clock concurrently; a cycle that finds a correction
//! already in flight skips instead of queueing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::probe::{ClockControl, CorrectionError};

/// Delay before the first retry; doubles per attempt.
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Whether a measured offset warrants touching the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncDecision {
    InSync,
    CorrectionNeeded { offset_ms: f64 },
}

/// Strictly-greater comparison against the tolerance, so an offset exactly
/// at the tolerance is left alone.
pub fn decide(offset_ms: f64, tolerance_secs: f64) -> SyncDecision {
    let tolerance_ms = tolerance_secs * 1000.0;
    if offset_ms.abs() > tolerance_ms {
        SyncDecision::CorrectionNeeded { offset_ms }
    } else {
        SyncDecision::InSync
    }
}

/// Result of one synchronization pass.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Offset within tolerance; nothing done.
    InSync { offset_ms: f64 },
    /// Clock adjusted.
    Corrected { offset_ms: f64, attempts: u32 },
    /// The process may not set the clock. Never retried.
    PermissionDenied,
    /// All retry attempts failed.
    Failed { attempts: u32, error: String },
    /// Another correction was already in flight; this pass skipped.
    Busy,
}

/// Serializes and retries clock corrections.
pub struct SyncController {
    clock: Arc<dyn ClockControl>,
    guard: Mutex<()>,
    max_attempts: u32,
    backoff: Duration,
}

impl SyncController {
    pub fn new(clock: Arc<dyn ClockControl>, max_attempts: u32) -> Self {
        Self {
            clock,
            guard: Mutex::new(()),
            max_attempts: max_attempts.max(1),
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Decide and, if needed, correct.
    #[instrument(skip(self))]
    pub async fn synchronize(&self, offset_ms: f64, tolerance_secs: f64) -> SyncOutcome {
        match decide(offset_ms, tolerance_secs) {
            SyncDecision::InSync => {
                debug!("offset {offset_ms:.1}ms within tolerance, no correction");
                SyncOutcome::InSync { offset_ms }
            }
            SyncDecision::CorrectionNeeded { offset_ms } => self.correct(offset_ms).await,
        }
    }

    async fn correct(&self, offset_ms: f64) -> SyncOutcome {
        let Ok(_held) = self.guard.try_lock() else {
            warn!("correction already in flight, skipping");
            return SyncOutcome::Busy;
        };

        let mut delay = self.backoff;
        for attempt in 1..=self.max_attempts {
            match self.clock.apply_correction(offset_ms).await {
                Ok(()) => {
                    info!("clock corrected by {offset_ms:.1}ms on attempt {attempt}");
                    return SyncOutcome::Corrected {
                        offset_ms,
                        attempts: attempt,
                    };
                }
                Err(CorrectionError::PermissionDenied) => {
                    warn!("clock correction denied: missing privileges");
                    return SyncOutcome::PermissionDenied;
                }
                Err(CorrectionError::Failed(msg)) => {
                    warn!("correction attempt {attempt}/{} failed: {msg}", self.max_attempts);
                    if attempt == self.max_attempts {
                        return SyncOutcome::Failed {
                            attempts: attempt,
                            error: msg,
                        };
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }

        // loop always returns beforehand
        SyncOutcome::Failed {
            attempts: self.max_attempts,
            error: "exhausted attempts".to_string(),
        }
    }
}
