//! Rolling-window statistics over check samples.
//!
//! Each server gets a fixed-size ring buffer. Averages and the success
//! ratio come from running sums maintained on insert/evict, so recording
//! a sample is O(1) regardless of the retention length.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::{Sample, ServerId};

/// Minimum successful samples before the anomaly detector produces a score.
const MIN_SAMPLES_FOR_ANOMALY: usize = 8;

/// Derived statistics over the trailing window of one subject.
///
/// All fields are `None` when the window holds no usable data, so a newly
/// added server reports "no data yet" instead of a fake 0% uptime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowStats {
    pub sample_count: usize,
    pub success_count: usize,
    pub avg_response_ms: Option<f64>,
    pub min_response_ms: Option<f64>,
    pub max_response_ms: Option<f64>,
    pub p95_response_ms: Option<f64>,
    pub avg_abs_offset_ms: Option<f64>,
    pub uptime_percent: Option<f64>,
}

/// 95th percentile by nearest-rank over the measured responses.
fn percentile_95(mut responses: Vec<f64>) -> Option<f64> {
    if responses.is_empty() {
        return None;
    }
    responses.sort_by(f64::total_cmp);
    let rank = ((responses.len() as f64) * 0.95).ceil() as usize;
    Some(responses[rank.saturating_sub(1)])
}

/// Ring buffer plus running sums for one server.
#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<Sample>,
    success_count: usize,
    sum_response: f64,
    sum_abs_offset: f64,
    // for the anomaly detector (successful samples only)
    sum_offset: f64,
    sum_offset_sq: f64,
}

impl Window {
    fn push(&mut self, sample: Sample, capacity: usize) {
        while self.samples.len() >= capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.subtract(&evicted);
            }
        }
        self.add(&sample);
        self.samples.push_back(sample);
    }

    fn add(&mut self, sample: &Sample) {
        if sample.success {
            self.success_count += 1;
            if let Some(resp) = sample.response_time_ms {
                self.sum_response += resp;
            }
            if let Some(off) = sample.offset_ms {
                self.sum_abs_offset += off.abs();
                self.sum_offset += off;
                self.sum_offset_sq += off * off;
            }
        }
    }

    fn subtract(&mut self, sample: &Sample) {
        if sample.success {
            self.success_count -= 1;
            if let Some(resp) = sample.response_time_ms {
                self.sum_response -= resp;
            }
            if let Some(off) = sample.offset_ms {
                self.sum_abs_offset -= off.abs();
                self.sum_offset -= off;
                self.sum_offset_sq -= off * off;
            }
        }
    }

    fn stats(&self) -> WindowStats {
        let total = self.samples.len();
        if total == 0 {
            return WindowStats::default();
        }

        let successes = self.success_count;
        let measured = self
            .samples
            .iter()
            .filter(|s| s.success && s.response_time_ms.is_some())
            .count();

        let (avg_response, min_response, max_response, p95_response) = if measured > 0 {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut responses = Vec::with_capacity(measured);
            for s in &self.samples {
                if let Some(resp) = s.response_time_ms.filter(|_| s.success) {
                    min = min.min(resp);
                    max = max.max(resp);
                    responses.push(resp);
                }
            }
            (
                Some(self.sum_response / measured as f64),
                Some(min),
                Some(max),
                percentile_95(responses),
            )
        } else {
            (None, None, None, None)
        };

        let offsets = self
            .samples
            .iter()
            .filter(|s| s.success && s.offset_ms.is_some())
            .count();
        let avg_abs_offset = (offsets > 0).then(|| self.sum_abs_offset / offsets as f64);

        WindowStats {
            sample_count: total,
            success_count: successes,
            avg_response_ms: avg_response,
            min_response_ms: min_response,
            max_response_ms: max_response,
            p95_response_ms: p95_response,
            avg_abs_offset_ms: avg_abs_offset,
            uptime_percent: Some(successes as f64 / total as f64 * 100.0),
        }
    }

    /// Rolling mean and standard deviation of the signed offset.
    fn offset_distribution(&self) -> Option<(f64, f64)> {
        let n = self
            .samples
            .iter()
            .filter(|s| s.success && s.offset_ms.is_some())
            .count();
        if n < MIN_SAMPLES_FOR_ANOMALY {
            return None;
        }
        let n = n as f64;
        let mean = self.sum_offset / n;
        let variance = (self.sum_offset_sq / n - mean * mean).max(0.0);
        Some((mean, variance.sqrt()))
    }
}

/// Per-server rolling windows with O(1) amortized recording.
pub struct MetricsAggregator {
    retention: usize,
    windows: HashMap<ServerId, Window>,
}

impl MetricsAggregator {
    pub fn new(retention_samples: usize) -> Self {
        Self {
            retention: retention_samples.max(1),
            windows: HashMap::new(),
        }
    }

    /// Change the window length. Existing windows shrink lazily on the
    /// next insert.
    pub fn set_retention(&mut self, retention_samples: usize) {
        self.retention = retention_samples.max(1);
    }

    pub fn record(&mut self, sample: &Sample) {
        self.windows
            .entry(sample.server_id)
            .or_default()
            .push(sample.clone(), self.retention);
    }

    pub fn server_stats(&self, id: ServerId) -> WindowStats {
        self.windows
            .get(&id)
            .map(Window::stats)
            .unwrap_or_default()
    }

    /// Aggregate stats across a pool's members.
    pub fn pool_stats(&self, members: &[ServerId]) -> WindowStats {
        let mut total = 0usize;
        let mut successes = 0usize;
        let mut sum_response = 0.0;
        let mut responses = Vec::new();
        let mut sum_abs_offset = 0.0;
        let mut offsets = 0usize;
        let mut min_response = f64::INFINITY;
        let mut max_response = f64::NEG_INFINITY;

        for id in members {
            let Some(window) = self.windows.get(id) else {
                continue;
            };
            total += window.samples.len();
            successes += window.success_count;
            for s in &window.samples {
                if !s.success {
                    continue;
                }
                if let Some(resp) = s.response_time_ms {
                    sum_response += resp;
                    responses.push(resp);
                    min_response = min_response.min(resp);
                    max_response = max_response.max(resp);
                }
                if let Some(off) = s.offset_ms {
                    sum_abs_offset += off.abs();
                    offsets += 1;
                }
            }
        }

        let measured = responses.len();
        WindowStats {
            sample_count: total,
            success_count: successes,
            avg_response_ms: (measured > 0).then(|| sum_response / measured as f64),
            min_response_ms: (measured > 0).then_some(min_response),
            max_response_ms: (measured > 0).then_some(max_response),
            p95_response_ms: percentile_95(responses),
            avg_abs_offset_ms: (offsets > 0).then(|| sum_abs_offset / offsets as f64),
            uptime_percent: (total > 0).then(|| successes as f64 / total as f64 * 100.0),
        }
    }

    /// Standard-score of an offset value against the server's rolling
    /// distribution. `None` until enough successful samples accumulate.
    pub fn offset_zscore(&self, id: ServerId, offset_ms: f64) -> Option<f64> {
        let (mean, stddev) = self.windows.get(&id)?.offset_distribution()?;
        if stddev <= f64::EPSILON {
            return None;
        }
        Some((offset_ms - mean).abs() / stddev)
    }

    /// Most recent samples, newest first. Used for alert context snapshots.
    pub fn recent_samples(&self, id: ServerId, limit: usize) -> Vec<Sample> {
        self.windows.get(&id).map_or_else(Vec::new, |w| {
            w.samples.iter().rev().take(limit).cloned().collect()
        })
    }
}
