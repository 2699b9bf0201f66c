//! Alert rules, debounce, and lifecycle.
//!
//! Threshold rules fire only after a configurable number of consecutive
//! breaches and clear only after the same number of consecutive in-band
//! readings, so a single spike never flips an alert on or off. One
//! subject/rule pair owns at most one open alert; repeated breaches
//! update that alert in place instead of stacking duplicates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metrics::WindowStats;
use crate::{PoolId, PoolStatus, Sample, ServerId, config::AlertConfig};

/// Minimum window size before the uptime rule is considered meaningful.
const MIN_UPTIME_SAMPLES: usize = 10;

/// Ordered so that escalation is a simple `>` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    /// Open alerts participate in dedup and auto-resolution.
    pub fn is_open(self) -> bool {
        matches!(self, AlertStatus::Active | AlertStatus::Acknowledged)
    }
}

/// What condition an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    ResponseTime,
    Offset,
    Uptime,
    Anomaly,
    PoolHealth,
    SyncFailure,
    Privilege,
}

/// The entity an alert is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum SubjectRef {
    Server(ServerId),
    Pool(PoolId),
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectRef::Server(id) => write!(f, "server {id}"),
            SubjectRef::Pool(id) => write!(f, "pool {id}"),
        }
    }
}

pub type AlertId = u64;

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub subject: SubjectRef,
    pub rule: RuleKind,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: String,
    /// Observed value that triggered the rule, where one exists.
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    /// Recent samples for the subject at the time the alert was raised.
    pub context: Vec<Sample>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Who acknowledged the alert, when the caller identified themselves.
    pub acknowledged_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Change to an alert, published so listeners can react.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    Raised(Alert),
    Escalated(Alert),
    Resolved(Alert),
}

#[derive(Debug)]
pub enum AlertError {
    NotFound(AlertId),
    InvalidTransition {
        id: AlertId,
        from: AlertStatus,
    },
}

impl fmt::Display for AlertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertError::NotFound(id) => write!(f, "alert {id} not found"),
            AlertError::InvalidTransition { id, from } => {
                write!(f, "alert {id} cannot leave terminal status {from:?}")
            }
        }
    }
}

impl std::error::Error for AlertError {}

/// Consecutive breach/clear counters for one subject/rule pair.
#[derive(Debug, Default, Clone, Copy)]
struct Streak {
    breaches: usize,
    clears: usize,
}

/// Evaluates samples and window stats against the configured rules and
/// owns the alert store.
pub struct AlertEvaluator {
    config: AlertConfig,
    alerts: BTreeMap<AlertId, Alert>,
    open: HashMap<(SubjectRef, RuleKind), AlertId>,
    streaks: HashMap<(SubjectRef, RuleKind), Streak>,
    next_id: AlertId,
}

impl AlertEvaluator {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            alerts: BTreeMap::new(),
            open: HashMap::new(),
            streaks: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Swap in new rule settings. Streak counters reset so the new
    /// thresholds start from a clean slate.
    pub fn set_config(&mut self, config: AlertConfig) {
        self.config = config;
        self.streaks.clear();
    }

    /// Evaluate one server sample plus its rolling stats. `recent` is
    /// captured as the context snapshot of any alert raised here.
    /// Returns the lifecycle events this observation caused.
    pub fn observe(
        &mut self,
        sample: &Sample,
        stats: &WindowStats,
        offset_zscore: Option<f64>,
        recent: &[Sample],
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        let subject = SubjectRef::Server(sample.server_id);

        if self.config.thresholds_enabled {
            if sample.success {
                if let Some(resp) = sample.response_time_ms {
                    self.check_threshold(
                        subject,
                        RuleKind::ResponseTime,
                        Severity::High,
                        resp,
                        self.config.response_time_ms,
                        format!(
                            "{subject} responded in {resp:.0}ms (threshold {:.0}ms)",
                            self.config.response_time_ms
                        ),
                        recent,
                        &mut events,
                    );
                }
                if let Some(off) = sample.offset_ms {
                    self.check_threshold(
                        subject,
                        RuleKind::Offset,
                        Severity::Critical,
                        off.abs(),
                        self.config.offset_ms,
                        format!(
                            "{subject} clock offset {:.1}ms (threshold {:.0}ms)",
                            off.abs(),
                            self.config.offset_ms
                        ),
                        recent,
                        &mut events,
                    );
                }
            }

            if stats.sample_count >= MIN_UPTIME_SAMPLES {
                if let Some(uptime) = stats.uptime_percent {
                    self.check_uptime(subject, uptime, recent, &mut events);
                }
            }
        }

        if self.config.anomaly_enabled && sample.success {
            if let (Some(z), Some(off)) = (offset_zscore, sample.offset_ms) {
                self.check_anomaly(subject, z, off, recent, &mut events);
            }
        }

        events
    }

    #[allow(clippy::too_many_arguments)]
    fn check_threshold(
        &mut self,
        subject: SubjectRef,
        rule: RuleKind,
        base: Severity,
        value: f64,
        threshold: f64,
        message: String,
        recent: &[Sample],
        events: &mut Vec<AlertEvent>,
    ) {
        if value > threshold {
            let severity = if value >= threshold * 2.0 {
                Severity::Critical
            } else {
                base
            };
            self.breach(
                subject,
                rule,
                severity,
                message,
                Some(value),
                Some(threshold),
                recent,
                events,
            );
        } else {
            self.in_band(subject, rule, events);
        }
    }

    fn check_uptime(
        &mut self,
        subject: SubjectRef,
        uptime: f64,
        recent: &[Sample],
        events: &mut Vec<AlertEvent>,
    ) {
        let threshold = self.config.uptime_percent;
        if uptime < threshold {
            let severity = if uptime < 50.0 {
                Severity::Critical
            } else {
                Severity::High
            };
            let message = format!("{subject} uptime {uptime:.1}% below {threshold:.1}%");
            self.breach(
                subject,
                RuleKind::Uptime,
                severity,
                message,
                Some(uptime),
                Some(threshold),
                recent,
                events,
            );
        } else {
            self.in_band(subject, RuleKind::Uptime, events);
        }
    }

    fn check_anomaly(
        &mut self,
        subject: SubjectRef,
        zscore: f64,
        offset_ms: f64,
        recent: &[Sample],
        events: &mut Vec<AlertEvent>,
    ) {
        let k = self.config.sensitivity.k();
        if zscore >= k {
            let severity = if zscore >= k * 2.0 {
                Severity::High
            } else {
                Severity::Medium
            };
            let message = format!(
                "{subject} offset {offset_ms:.1}ms deviates {zscore:.1} sigma from its baseline"
            );
            self.breach(
                subject,
                RuleKind::Anomaly,
                severity,
                message,
                Some(offset_ms),
                None,
                recent,
                events,
            );
        } else {
            self.in_band(subject, RuleKind::Anomaly, events);
        }
    }

    /// One breaching observation. Raises once the streak reaches the
    /// debounce count, escalates an already-open alert when the severity
    /// worsened, and refreshes the observed value and context either way.
    #[allow(clippy::too_many_arguments)]
    fn breach(
        &mut self,
        subject: SubjectRef,
        rule: RuleKind,
        severity: Severity,
        message: String,
        value: Option<f64>,
        threshold: Option<f64>,
        recent: &[Sample],
        events: &mut Vec<AlertEvent>,
    ) {
        let key = (subject, rule);
        let streak = self.streaks.entry(key).or_default();
        streak.clears = 0;
        streak.breaches = streak.breaches.saturating_add(1);
        let breaches = streak.breaches;

        if let Some(&id) = self.open.get(&key) {
            let Some(alert) = self.alerts.get_mut(&id) else {
                return;
            };
            alert.value = value;
            alert.message = message;
            alert.context = recent.to_vec();
            alert.updated_at = Utc::now();
            if severity > alert.severity {
                alert.severity = severity;
                warn!("alert {id} escalated to {severity:?} for {subject}");
                events.push(AlertEvent::Escalated(alert.clone()));
            }
            return;
        }

        if breaches >= self.config.debounce {
            let alert = self.raise(
                subject,
                rule,
                severity,
                message,
                value,
                threshold,
                recent.to_vec(),
            );
            events.push(AlertEvent::Raised(alert));
        } else {
            debug!(
                "{subject} {rule:?} breach {breaches}/{} (debouncing)",
                self.config.debounce
            );
        }
    }

    /// One in-band observation. Auto-resolves the open alert once the
    /// clear streak reaches the debounce count.
    fn in_band(&mut self, subject: SubjectRef, rule: RuleKind, events: &mut Vec<AlertEvent>) {
        let key = (subject, rule);
        let Some(streak) = self.streaks.get_mut(&key) else {
            return;
        };
        streak.breaches = 0;

        if !self.open.contains_key(&key) {
            self.streaks.remove(&key);
            return;
        }

        streak.clears = streak.clears.saturating_add(1);
        if streak.clears >= self.config.debounce {
            self.streaks.remove(&key);
            if let Some(alert) = self.close_open(key, AlertStatus::Resolved) {
                events.push(AlertEvent::Resolved(alert));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn raise(
        &mut self,
        subject: SubjectRef,
        rule: RuleKind,
        severity: Severity,
        message: String,
        value: Option<f64>,
        threshold: Option<f64>,
        context: Vec<Sample>,
    ) -> Alert {
        let id = self.next_id;
        self.next_id += 1;
        let now = Utc::now();
        let alert = Alert {
            id,
            subject,
            rule,
            severity,
            status: AlertStatus::Active,
            message,
            value,
            threshold,
            context,
            created_at: now,
            updated_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            closed_at: None,
        };
        warn!("alert {id} raised: {}", alert.message);
        self.open.insert((subject, rule), id);
        self.alerts.insert(id, alert.clone());
        alert
    }

    fn close_open(&mut self, key: (SubjectRef, RuleKind), status: AlertStatus) -> Option<Alert> {
        let id = self.open.remove(&key)?;
        let alert = self.alerts.get_mut(&id)?;
        let now = Utc::now();
        alert.status = status;
        alert.updated_at = now;
        alert.closed_at = Some(now);
        debug!("alert {id} closed as {status:?}");
        Some(alert.clone())
    }

    /// Evaluate a pool's derived status after selection. A pool with no
    /// reachable member alerts immediately; member statuses are already
    /// debounced through their consecutive-failure counters, so the pool
    /// rule does not add a second round of debouncing. Recovery resolves
    /// the alert on the first healthy cycle.
    pub fn observe_pool(&mut self, pool_id: PoolId, status: PoolStatus) -> Vec<AlertEvent> {
        let subject = SubjectRef::Pool(pool_id);
        if status == PoolStatus::Failed {
            return self.raise_direct(
                subject,
                RuleKind::PoolHealth,
                Severity::Critical,
                format!("{subject} has no reachable members"),
            );
        }
        if let Some(alert) = self.close_open((subject, RuleKind::PoolHealth), AlertStatus::Resolved)
        {
            return vec![AlertEvent::Resolved(alert)];
        }
        Vec::new()
    }

    // === sync-driven alerts, raised without debounce ===

    /// A correction attempt exhausted its retries.
    pub fn sync_failed(&mut self, server_id: ServerId, detail: &str) -> Vec<AlertEvent> {
        self.raise_direct(
            SubjectRef::Server(server_id),
            RuleKind::SyncFailure,
            Severity::High,
            format!("clock correction via server {server_id} failed: {detail}"),
        )
    }

    /// The process lacks the privilege to set the clock. Not retried.
    pub fn privilege_denied(&mut self, server_id: ServerId) -> Vec<AlertEvent> {
        self.raise_direct(
            SubjectRef::Server(server_id),
            RuleKind::Privilege,
            Severity::Critical,
            "clock correction requires administrative privileges".to_string(),
        )
    }

    /// A correction succeeded; any open sync alerts for the server clear.
    pub fn sync_succeeded(&mut self, server_id: ServerId) -> Vec<AlertEvent> {
        let subject = SubjectRef::Server(server_id);
        let mut events = Vec::new();
        for rule in [RuleKind::SyncFailure, RuleKind::Privilege] {
            if let Some(alert) = self.close_open((subject, rule), AlertStatus::Resolved) {
                events.push(AlertEvent::Resolved(alert));
            }
        }
        events
    }

    fn raise_direct(
        &mut self,
        subject: SubjectRef,
        rule: RuleKind,
        severity: Severity,
        message: String,
    ) -> Vec<AlertEvent> {
        let key = (subject, rule);
        if let Some(&id) = self.open.get(&key) {
            if let Some(alert) = self.alerts.get_mut(&id) {
                alert.message = message;
                alert.updated_at = Utc::now();
                if severity > alert.severity {
                    alert.severity = severity;
                    return vec![AlertEvent::Escalated(alert.clone())];
                }
            }
            return Vec::new();
        }
        vec![AlertEvent::Raised(self.raise(
            subject,
            rule,
            severity,
            message,
            None,
            None,
            Vec::new(),
        ))]
    }

    // === operator lifecycle ===

    pub fn acknowledge(&mut self, id: AlertId, by: Option<String>) -> Result<Alert, AlertError> {
        let alert = self.alerts.get_mut(&id).ok_or(AlertError::NotFound(id))?;
        match alert.status {
            AlertStatus::Active => {
                let now = Utc::now();
                alert.status = AlertStatus::Acknowledged;
                alert.acknowledged_at = Some(now);
                alert.acknowledged_by = by;
                alert.updated_at = now;
                Ok(alert.clone())
            }
            // repeat acknowledgments keep the original actor
            AlertStatus::Acknowledged => Ok(alert.clone()),
            from => Err(AlertError::InvalidTransition { id, from }),
        }
    }

    pub fn resolve(&mut self, id: AlertId) -> Result<Alert, AlertError> {
        self.close_manual(id, AlertStatus::Resolved)
    }

    pub fn dismiss(&mut self, id: AlertId) -> Result<Alert, AlertError> {
        self.close_manual(id, AlertStatus::Dismissed)
    }

    fn close_manual(&mut self, id: AlertId, status: AlertStatus) -> Result<Alert, AlertError> {
        let alert = self.alerts.get_mut(&id).ok_or(AlertError::NotFound(id))?;
        if !alert.status.is_open() {
            return Err(AlertError::InvalidTransition {
                id,
                from: alert.status,
            });
        }
        let key = (alert.subject, alert.rule);
        let now = Utc::now();
        alert.status = status;
        alert.updated_at = now;
        alert.closed_at = Some(now);
        let closed = alert.clone();
        self.open.remove(&key);
        self.streaks.remove(&key);
        Ok(closed)
    }

    // === reads ===

    pub fn alert(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.get(&id)
    }

    /// All alerts, newest first, optionally filtered to open ones.
    pub fn alerts(&self, open_only: bool) -> Vec<Alert> {
        self.alerts
            .values()
            .rev()
            .filter(|a| !open_only || a.status.is_open())
            .cloned()
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProbeErrorKind;
    use crate::config::Sensitivity;
    use assert_matches::assert_matches;

    fn config() -> AlertConfig {
        AlertConfig {
            debounce: 3,
            ..AlertConfig::default()
        }
    }

    fn quiet_stats() -> WindowStats {
        WindowStats::default()
    }

    fn raised(events: &[AlertEvent]) -> Option<&Alert> {
        events.iter().find_map(|e| match e {
            AlertEvent::Raised(a) => Some(a),
            _ => None,
        })
    }

    #[test]
    fn debounce_holds_back_single_spike() {
        let mut eval = AlertEvaluator::new(config());
        let spike = Sample::ok(1, 5000.0, 1.0);

        for _ in 0..2 {
            let events = eval.observe(&spike, &quiet_stats(), None, &[]);
            assert!(raised(&events).is_none());
        }
        let events = eval.observe(&spike, &quiet_stats(), None, &[]);
        let alert = raised(&events).unwrap();
        assert_eq!(alert.rule, RuleKind::ResponseTime);
        assert_eq!(alert.severity, Severity::Critical); // 5000 >= 2 * 1000
    }

    #[test]
    fn raised_alert_captures_context_snapshot() {
        let mut eval = AlertEvaluator::new(config());
        let spike = Sample::ok(1, 5000.0, 1.0);
        let recent = vec![spike.clone(), Sample::ok(1, 4800.0, 1.0)];

        for _ in 0..2 {
            eval.observe(&spike, &quiet_stats(), None, &recent);
        }
        let events = eval.observe(&spike, &quiet_stats(), None, &recent);
        let alert = raised(&events).unwrap();
        assert_eq!(alert.context.len(), 2);
        assert_eq!(alert.context[1].response_time_ms, Some(4800.0));
    }

    #[test]
    fn in_band_reading_resets_breach_streak() {
        let mut eval = AlertEvaluator::new(config());
        let spike = Sample::ok(1, 1500.0, 1.0);
        let calm = Sample::ok(1, 20.0, 1.0);

        eval.observe(&spike, &quiet_stats(), None, &[]);
        eval.observe(&spike, &quiet_stats(), None, &[]);
        eval.observe(&calm, &quiet_stats(), None, &[]);
        let events = eval.observe(&spike, &quiet_stats(), None, &[]);
        assert!(raised(&events).is_none(), "streak should have reset");
    }

    #[test]
    fn dedup_updates_open_alert_in_place() {
        let mut eval = AlertEvaluator::new(config());
        let spike = Sample::ok(1, 1500.0, 1.0);
        for _ in 0..3 {
            eval.observe(&spike, &quiet_stats(), None, &[]);
        }
        assert_eq!(eval.open_count(), 1);

        // further breaches update, never duplicate
        for _ in 0..5 {
            eval.observe(&spike, &quiet_stats(), None, &[]);
        }
        assert_eq!(eval.open_count(), 1);
        assert_eq!(eval.alerts(false).len(), 1);
    }

    #[test]
    fn escalates_in_place_when_severity_worsens() {
        let mut eval = AlertEvaluator::new(config());
        let warn_spike = Sample::ok(1, 1500.0, 1.0);
        for _ in 0..3 {
            eval.observe(&warn_spike, &quiet_stats(), None, &[]);
        }
        let id = eval.alerts(true)[0].id;
        assert_eq!(eval.alert(id).unwrap().severity, Severity::High);

        let crit_spike = Sample::ok(1, 3000.0, 1.0);
        let events = eval.observe(&crit_spike, &quiet_stats(), None, &[]);
        assert_matches!(events.as_slice(), [AlertEvent::Escalated(_)]);
        assert_eq!(eval.alert(id).unwrap().severity, Severity::Critical);
    }

    #[test]
    fn hysteresis_resolves_after_consecutive_clears() {
        let mut eval = AlertEvaluator::new(config());
        let spike = Sample::ok(1, 1500.0, 1.0);
        let calm = Sample::ok(1, 20.0, 1.0);
        for _ in 0..3 {
            eval.observe(&spike, &quiet_stats(), None, &[]);
        }
        let id = eval.alerts(true)[0].id;

        for _ in 0..2 {
            let events = eval.observe(&calm, &quiet_stats(), None, &[]);
            assert!(events.is_empty());
        }
        let events = eval.observe(&calm, &quiet_stats(), None, &[]);
        assert_matches!(events.as_slice(), [AlertEvent::Resolved(_)]);
        assert_eq!(eval.alert(id).unwrap().status, AlertStatus::Resolved);
        assert_eq!(eval.open_count(), 0);
    }

    #[test]
    fn separate_rules_get_separate_alerts() {
        let mut eval = AlertEvaluator::new(config());
        // breaches both response time and offset
        let bad = Sample::ok(1, 1500.0, 250.0);
        for _ in 0..3 {
            eval.observe(&bad, &quiet_stats(), None, &[]);
        }
        assert_eq!(eval.open_count(), 2);
    }

    #[test]
    fn uptime_rule_needs_enough_samples() {
        let mut eval = AlertEvaluator::new(config());
        let sample = Sample::failed(1, ProbeErrorKind::Timeout);

        let thin = WindowStats {
            sample_count: 5,
            success_count: 0,
            uptime_percent: Some(0.0),
            ..WindowStats::default()
        };
        for _ in 0..5 {
            let events = eval.observe(&sample, &thin, None, &[]);
            assert!(events.is_empty());
        }

        let full = WindowStats {
            sample_count: 20,
            success_count: 10,
            uptime_percent: Some(50.0),
            ..WindowStats::default()
        };
        for _ in 0..2 {
            eval.observe(&sample, &full, None, &[]);
        }
        let events = eval.observe(&sample, &full, None, &[]);
        let alert = raised(&events).unwrap();
        assert_eq!(alert.rule, RuleKind::Uptime);
    }

    #[test]
    fn anomaly_uses_sensitivity() {
        let mut cfg = config();
        cfg.sensitivity = Sensitivity::High; // k = 2.5
        let mut eval = AlertEvaluator::new(cfg);
        let sample = Sample::ok(1, 20.0, 30.0);

        for _ in 0..2 {
            eval.observe(&sample, &quiet_stats(), Some(2.8), &[]);
        }
        let events = eval.observe(&sample, &quiet_stats(), Some(2.8), &[]);
        let alert = raised(&events).unwrap();
        assert_eq!(alert.rule, RuleKind::Anomaly);

        let mut low = AlertEvaluator::new(config()); // Medium, k = 3.0
        for _ in 0..3 {
            let events = low.observe(&sample, &quiet_stats(), Some(2.8), &[]);
            assert!(events.is_empty());
        }
    }

    #[test]
    fn failed_pool_raises_and_recovery_resolves() {
        let mut eval = AlertEvaluator::new(config());

        let events = eval.observe_pool(7, PoolStatus::Failed);
        assert_matches!(
            events.as_slice(),
            [AlertEvent::Raised(a)] if a.subject == SubjectRef::Pool(7)
                && a.rule == RuleKind::PoolHealth
                && a.severity == Severity::Critical
        );

        // a pool that stays down updates the open alert, never duplicates
        assert!(eval.observe_pool(7, PoolStatus::Failed).is_empty());
        assert_eq!(eval.open_count(), 1);

        let events = eval.observe_pool(7, PoolStatus::Active);
        assert_matches!(events.as_slice(), [AlertEvent::Resolved(_)]);
        assert_eq!(eval.open_count(), 0);

        // healthy pools never open the rule in the first place
        assert!(eval.observe_pool(8, PoolStatus::Degraded).is_empty());
    }

    #[test]
    fn sync_alerts_skip_debounce_and_clear_on_success() {
        let mut eval = AlertEvaluator::new(config());
        let events = eval.privilege_denied(3);
        assert_matches!(events.as_slice(), [AlertEvent::Raised(a)] if a.severity == Severity::Critical);

        let events = eval.sync_succeeded(3);
        assert_matches!(events.as_slice(), [AlertEvent::Resolved(_)]);
    }

    #[test]
    fn lifecycle_transitions() {
        let mut eval = AlertEvaluator::new(config());
        let id = match eval.sync_failed(1, "device busy").pop().unwrap() {
            AlertEvent::Raised(a) => a.id,
            other => panic!("unexpected event {other:?}"),
        };

        let alert = eval.acknowledge(id, Some("ops".into())).unwrap();
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert_eq!(alert.acknowledged_by.as_deref(), Some("ops"));
        // acknowledging twice is a no-op and keeps the original actor
        let alert = eval.acknowledge(id, Some("late".into())).unwrap();
        assert_eq!(alert.acknowledged_by.as_deref(), Some("ops"));

        let alert = eval.dismiss(id).unwrap();
        assert_eq!(alert.status, AlertStatus::Dismissed);

        // terminal states reject further transitions
        assert_matches!(
            eval.acknowledge(id, None),
            Err(AlertError::InvalidTransition { .. })
        );
        assert_matches!(eval.resolve(id), Err(AlertError::InvalidTransition { .. }));
        assert_matches!(eval.resolve(999), Err(AlertError::NotFound(999)));
    }

    #[test]
    fn acknowledged_alert_still_auto_resolves() {
        let mut eval = AlertEvaluator::new(config());
        let spike = Sample::ok(1, 1500.0, 1.0);
        let calm = Sample::ok(1, 20.0, 1.0);
        for _ in 0..3 {
            eval.observe(&spike, &quiet_stats(), None, &[]);
        }
        let id = eval.alerts(true)[0].id;
        eval.acknowledge(id, None).unwrap();

        for _ in 0..3 {
            eval.observe(&calm, &quiet_stats(), None, &[]);
        }
        assert_eq!(eval.alert(id).unwrap().status, AlertStatus::Resolved);
    }
}
