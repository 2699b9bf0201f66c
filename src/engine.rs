//! MonitorEngine - the actor driving the check/balance/sync cycle.
//!
//! One engine task owns the metrics windows, the alert evaluator, the
//! balancer cursors, and the sync controller. Everything else talks to it
//! through commands over an mpsc channel; outcomes are published on a
//! broadcast channel so multiple consumers can follow along.
//!
//! ## Cycle
//!
//! ```text
//! Timer tick → probe all enabled servers (bounded fan-out)
//!            → fold samples into registry / metrics / store / alerts
//!            → select a member per pool
//!            → decide and apply clock correction
//!     ↑
//!     └─── Commands (CheckNow, TestServer, Pause, UpdateConfig, ...)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore, broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::alerts::{Alert, AlertError, AlertEvaluator, AlertEvent, AlertId};
use crate::balancer::{self, Balancer, MemberView};
use crate::config::{AlertConfig, Config, ConfigError, MonitorConfig, ServerConfig};
use crate::metrics::{MetricsAggregator, WindowStats};
use crate::probe::{ClockControl, ProbeError, TimeSource};
use crate::registry::Registry;
use crate::storage::MetricStore;
use crate::sync::{SyncController, SyncOutcome};
use crate::{PoolId, Sample, ServerId, ServerStatus};

/// Request that failed inside the engine.
#[derive(Debug)]
pub enum EngineError {
    UnknownServer(ServerId),
    UnknownPool(PoolId),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownServer(id) => write!(f, "server {id} not found"),
            EngineError::UnknownPool(id) => write!(f, "pool {id} not found"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Operator action on a single alert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Acknowledge { by: Option<String> },
    Resolve,
    Dismiss,
}

/// Summary of one completed check cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub checked: usize,
    pub failed: usize,
}

/// Engine status snapshot for health endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub paused: bool,
    pub interval_secs: u64,
    pub cycles_completed: u64,
    pub last_cycle: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
    pub open_alerts: usize,
}

/// Outcome of a sync pass, published alongside samples and alerts.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub server_id: ServerId,
    pub outcome: SyncOutcome,
}

/// Everything the engine publishes.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Sample(Sample),
    Alert(AlertEvent),
    Sync(SyncEvent),
}

enum EngineCommand {
    CheckNow {
        respond_to: oneshot::Sender<CycleReport>,
    },
    TestServer {
        id: ServerId,
        respond_to: oneshot::Sender<Result<Sample, EngineError>>,
    },
    TestPool {
        id: PoolId,
        respond_to: oneshot::Sender<Result<Vec<Sample>, EngineError>>,
    },
    Pause {
        respond_to: oneshot::Sender<()>,
    },
    Resume {
        respond_to: oneshot::Sender<()>,
    },
    GetStatus {
        respond_to: oneshot::Sender<EngineStatus>,
    },
    GetMonitorConfig {
        respond_to: oneshot::Sender<MonitorConfig>,
    },
    UpdateMonitorConfig {
        config: MonitorConfig,
        respond_to: oneshot::Sender<Result<(), ConfigError>>,
    },
    GetAlertConfig {
        respond_to: oneshot::Sender<AlertConfig>,
    },
    UpdateAlertConfig {
        config: AlertConfig,
        respond_to: oneshot::Sender<Result<(), ConfigError>>,
    },
    GetAlerts {
        open_only: bool,
        respond_to: oneshot::Sender<Vec<Alert>>,
    },
    GetAlert {
        id: AlertId,
        respond_to: oneshot::Sender<Option<Alert>>,
    },
    AlertAction {
        id: AlertId,
        action: AlertAction,
        respond_to: oneshot::Sender<Result<Alert, AlertError>>,
    },
    ServerStats {
        id: ServerId,
        respond_to: oneshot::Sender<Result<WindowStats, EngineError>>,
    },
    PoolStats {
        id: PoolId,
        respond_to: oneshot::Sender<Result<WindowStats, EngineError>>,
    },
    Shutdown,
}

pub struct MonitorEngine {
    config: MonitorConfig,
    registry: Arc<RwLock<Registry>>,
    source: Arc<dyn TimeSource>,
    store: Arc<dyn MetricStore>,
    metrics: MetricsAggregator,
    evaluator: AlertEvaluator,
    balancer: Balancer,
    sync: SyncController,
    command_rx: mpsc::Receiver<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
    paused: bool,
    cycles_completed: u64,
    last_cycle: Option<DateTime<Utc>>,
    last_sync: Option<DateTime<Utc>>,
}

impl MonitorEngine {
    #[allow(clippy::too_many_arguments)]
    fn new(
        config: &Config,
        registry: Arc<RwLock<Registry>>,
        source: Arc<dyn TimeSource>,
        clock: Arc<dyn ClockControl>,
        store: Arc<dyn MetricStore>,
        command_rx: mpsc::Receiver<EngineCommand>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            metrics: MetricsAggregator::new(config.monitor.retention_samples),
            evaluator: AlertEvaluator::new(config.alerts.clone()),
            balancer: Balancer::default(),
            sync: SyncController::new(clock, config.monitor.max_retry_attempts),
            config: config.monitor.clone(),
            registry,
            source,
            store,
            command_rx,
            event_tx,
            paused: false,
            cycles_completed: 0,
            last_cycle: None,
            last_sync: None,
        }
    }

    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting monitor engine");

        // first scheduled cycle comes one full interval after startup;
        // an immediate pass goes through CheckNow
        let mut ticker = scheduled_ticker(self.config.sync_interval_secs);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.paused {
                        trace!("paused, skipping cycle");
                        continue;
                    }
                    self.run_cycle().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        EngineCommand::CheckNow { respond_to } => {
                            let report = self.run_cycle().await;
                            let _ = respond_to.send(report);
                        }
                        EngineCommand::TestServer { id, respond_to } => {
                            let _ = respond_to.send(self.test_server(id).await);
                        }
                        EngineCommand::TestPool { id, respond_to } => {
                            let _ = respond_to.send(self.test_pool(id).await);
                        }
                        EngineCommand::Pause { respond_to } => {
                            debug!("monitoring paused");
                            self.paused = true;
                            let _ = respond_to.send(());
                        }
                        EngineCommand::Resume { respond_to } => {
                            debug!("monitoring resumed");
                            self.paused = false;
                            let _ = respond_to.send(());
                        }
                        EngineCommand::GetStatus { respond_to } => {
                            let _ = respond_to.send(self.status());
                        }
                        EngineCommand::GetMonitorConfig { respond_to } => {
                            let _ = respond_to.send(self.config.clone());
                        }
                        EngineCommand::UpdateMonitorConfig { config, respond_to } => {
                            let result = config.validate();
                            if result.is_ok() {
                                if config.sync_interval_secs != self.config.sync_interval_secs {
                                    ticker = scheduled_ticker(config.sync_interval_secs);
                                }
                                self.metrics.set_retention(config.retention_samples);
                                self.config = config;
                            }
                            let _ = respond_to.send(result);
                        }
                        EngineCommand::GetAlertConfig { respond_to } => {
                            let _ = respond_to.send(self.evaluator.config().clone());
                        }
                        EngineCommand::UpdateAlertConfig { config, respond_to } => {
                            let result = config.validate();
                            if result.is_ok() {
                                self.evaluator.set_config(config);
                            }
                            let _ = respond_to.send(result);
                        }
                        EngineCommand::GetAlerts { open_only, respond_to } => {
                            let _ = respond_to.send(self.evaluator.alerts(open_only));
                        }
                        EngineCommand::GetAlert { id, respond_to } => {
                            let _ = respond_to.send(self.evaluator.alert(id).cloned());
                        }
                        EngineCommand::AlertAction { id, action, respond_to } => {
                            let result = match action {
                                AlertAction::Acknowledge { by } => {
                                    self.evaluator.acknowledge(id, by)
                                }
                                AlertAction::Resolve => self.evaluator.resolve(id),
                                AlertAction::Dismiss => self.evaluator.dismiss(id),
                            };
                            let _ = respond_to.send(result);
                        }
                        EngineCommand::ServerStats { id, respond_to } => {
                            let known = self.registry.read().await.server(id).is_some();
                            let result = if known {
                                Ok(self.metrics.server_stats(id))
                            } else {
                                Err(EngineError::UnknownServer(id))
                            };
                            let _ = respond_to.send(result);
                        }
                        EngineCommand::PoolStats { id, respond_to } => {
                            let members = self
                                .registry
                                .read()
                                .await
                                .pool(id)
                                .map(|p| p.config.members.clone());
                            let result = match members {
                                Some(members) => Ok(self.metrics.pool_stats(&members)),
                                None => Err(EngineError::UnknownPool(id)),
                            };
                            let _ = respond_to.send(result);
                        }
                        EngineCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("monitor engine stopped");
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            paused: self.paused,
            interval_secs: self.config.sync_interval_secs,
            cycles_completed: self.cycles_completed,
            last_cycle: self.last_cycle,
            last_sync: self.last_sync,
            open_alerts: self.evaluator.open_count(),
        }
    }

    /// Probe every enabled server, fold the results in, rebalance the
    /// pools, then run the sync decision.
    #[instrument(skip(self))]
    async fn run_cycle(&mut self) -> CycleReport {
        let servers = self.registry.read().await.enabled_servers();
        if servers.is_empty() {
            trace!("no enabled servers, skipping cycle");
            return CycleReport::default();
        }

        let samples = self.probe_all(servers).await;
        let mut report = CycleReport::default();
        for sample in &samples {
            report.checked += 1;
            if !sample.success {
                report.failed += 1;
            }
        }
        for sample in samples {
            self.process_sample(sample).await;
        }

        self.balance_pools().await;
        self.synchronize_clock().await;

        self.cycles_completed += 1;
        self.last_cycle = Some(Utc::now());
        debug!(
            "cycle complete: {}/{} checks succeeded",
            report.checked - report.failed,
            report.checked
        );
        report
    }

    /// Concurrent fan-out over the server list, bounded by
    /// `max_concurrent_checks`, each probe capped by the per-check timeout.
    async fn probe_all(&self, servers: Vec<ServerConfig>) -> Vec<Sample> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_checks));
        let timeout = Duration::from_secs(self.config.ntp_timeout_secs);

        let mut tasks = JoinSet::new();
        for server in servers {
            let semaphore = semaphore.clone();
            let source = self.source.clone();
            tasks.spawn(async move {
                // closed only when the semaphore is dropped, which it is not
                let Ok(_permit) = semaphore.acquire().await else {
                    return Sample::failed(server.id, crate::ProbeErrorKind::Unreachable);
                };
                probe_one(source.as_ref(), &server, timeout).await
            });
        }

        let mut samples = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(sample) => samples.push(sample),
                Err(e) => error!("probe task panicked: {e}"),
            }
        }
        samples
    }

    /// Fold one sample into every consumer: registry status, rolling
    /// windows, durable store, and the alert rules. Publishes the sample
    /// and any alert transitions.
    async fn process_sample(&mut self, sample: Sample) {
        // score against the baseline before the sample joins it
        let zscore = sample
            .offset_ms
            .filter(|_| sample.success)
            .and_then(|off| self.metrics.offset_zscore(sample.server_id, off));

        self.registry.write().await.apply_sample(
            &sample,
            self.config.max_retry_attempts,
            self.evaluator.config(),
        );
        self.metrics.record(&sample);
        if let Err(e) = self.store.append(sample.clone()).await {
            error!("failed to persist sample: {e}");
        }

        let stats = self.metrics.server_stats(sample.server_id);
        let recent = self.metrics.recent_samples(sample.server_id, 5);
        let alert_events = self.evaluator.observe(&sample, &stats, zscore, &recent);

        self.publish(EngineEvent::Sample(sample));
        for event in alert_events {
            self.publish(EngineEvent::Alert(event));
        }
    }

    /// Re-run member selection for every enabled pool and evaluate the
    /// resulting pool health.
    async fn balance_pools(&mut self) {
        let mut alert_events = Vec::new();
        let mut registry = self.registry.write().await;
        for pool in registry.enabled_pools() {
            let members: Vec<MemberView> = pool
                .members
                .iter()
                .filter_map(|id| registry.server(*id))
                .map(|entry| {
                    let stats = self.metrics.server_stats(entry.config.id);
                    MemberView {
                        id: entry.config.id,
                        eligible: entry.config.enabled
                            && matches!(
                                entry.status,
                                ServerStatus::Online | ServerStatus::Warning
                            ),
                        warning: entry.status == ServerStatus::Warning,
                        weight: entry.config.weight,
                        avg_response_ms: stats.avg_response_ms,
                        avg_abs_offset_ms: stats.avg_abs_offset_ms,
                        outstanding: stats.sample_count,
                    }
                })
                .collect();

            let selected = self.balancer.select(pool.id, pool.method, &members);
            let status = balancer::pool_status(&members, selected);
            registry.apply_selection(pool.id, selected, status);
            alert_events.extend(self.evaluator.observe_pool(pool.id, status));
        }
        drop(registry);

        for event in alert_events {
            self.publish(EngineEvent::Alert(event));
        }
    }

    /// Run the sync decision against the sync pool's selected member.
    async fn synchronize_clock(&mut self) {
        let (server_id, offset_ms) = {
            let registry = self.registry.read().await;
            let pool = match self.config.sync_pool_id {
                Some(id) => registry.pool(id),
                None => registry
                    .enabled_pools()
                    .first()
                    .and_then(|p| registry.pool(p.id)),
            };
            let Some(selected) = pool.and_then(|p| p.selected) else {
                trace!("no selected sync server, skipping sync decision");
                return;
            };
            let Some(offset) = registry.server(selected).and_then(|e| e.last_offset_ms) else {
                return;
            };
            (selected, offset)
        };

        let outcome = self
            .sync
            .synchronize(offset_ms, self.config.time_tolerance_secs)
            .await;

        let alert_events = match &outcome {
            SyncOutcome::InSync { .. } => self.evaluator.sync_succeeded(server_id),
            SyncOutcome::Corrected { .. } => {
                self.last_sync = Some(Utc::now());
                self.process_sample(Sample::post_correction(server_id)).await;
                self.evaluator.sync_succeeded(server_id)
            }
            SyncOutcome::PermissionDenied => self.evaluator.privilege_denied(server_id),
            SyncOutcome::Failed { error, .. } => self.evaluator.sync_failed(server_id, error),
            SyncOutcome::Busy => Vec::new(),
        };

        for event in alert_events {
            self.publish(EngineEvent::Alert(event));
        }
        self.publish(EngineEvent::Sync(SyncEvent { server_id, outcome }));
    }

    async fn test_server(&mut self, id: ServerId) -> Result<Sample, EngineError> {
        let config = {
            let registry = self.registry.read().await;
            registry
                .server(id)
                .map(|e| e.config.clone())
                .ok_or(EngineError::UnknownServer(id))?
        };
        let timeout = Duration::from_secs(self.config.ntp_timeout_secs);
        let sample = probe_one(self.source.as_ref(), &config, timeout).await;
        self.process_sample(sample.clone()).await;
        Ok(sample)
    }

    async fn test_pool(&mut self, id: PoolId) -> Result<Vec<Sample>, EngineError> {
        let members = {
            let registry = self.registry.read().await;
            let pool = registry.pool(id).ok_or(EngineError::UnknownPool(id))?;
            pool.config
                .members
                .iter()
                .filter_map(|m| registry.server(*m).map(|e| e.config.clone()))
                .collect::<Vec<_>>()
        };

        let samples = self.probe_all(members).await;
        for sample in &samples {
            self.process_sample(sample.clone()).await;
        }
        Ok(samples)
    }

    /// Broadcast send errors only mean nobody is listening.
    fn publish(&self, event: EngineEvent) {
        if self.event_tx.send(event).is_err() {
            trace!("no subscribers for engine event");
        }
    }
}

fn scheduled_ticker(interval_secs: u64) -> tokio::time::Interval {
    let period = Duration::from_secs(interval_secs);
    interval_at(Instant::now() + period, period)
}

/// Single probe with the timeout applied outside the time source, so a
/// stuck implementation still yields a timeout sample.
async fn probe_one(source: &dyn TimeSource, server: &ServerConfig, timeout: Duration) -> Sample {
    let result = tokio::time::timeout(timeout, source.query(&server.host, server.port, timeout))
        .await
        .unwrap_or(Err(ProbeError::Timeout));

    match result {
        Ok(reading) => {
            trace!(
                "{}: {:.1}ms round trip, {:.1}ms offset",
                server.name, reading.round_trip_ms, reading.offset_ms
            );
            Sample::ok(server.id, reading.round_trip_ms, reading.offset_ms)
        }
        Err(e) => {
            debug!("{} probe failed: {e}", server.name);
            Sample::failed(server.id, e.kind())
        }
    }
}

/// Cloneable handle for talking to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    /// Spawn the engine as a tokio task and return its handle.
    pub fn spawn(
        config: &Config,
        registry: Arc<RwLock<Registry>>,
        source: Arc<dyn TimeSource>,
        clock: Arc<dyn ClockControl>,
        store: Arc<dyn MetricStore>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(256);

        let engine = MonitorEngine::new(
            config,
            registry,
            source,
            clock,
            store,
            cmd_rx,
            event_tx.clone(),
        );
        tokio::spawn(engine.run());

        Self {
            sender: cmd_tx,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Trigger a full check cycle immediately, bypassing the timer.
    pub async fn check_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::CheckNow { respond_to: tx })
            .await
            .context("failed to send CheckNow command")?;
        rx.await.context("failed to receive cycle report")
    }

    /// Probe one server on demand. The result feeds the normal pipeline.
    pub async fn test_server(&self, id: ServerId) -> Result<Result<Sample, EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::TestServer { id, respond_to: tx })
            .await
            .context("failed to send TestServer command")?;
        rx.await.context("failed to receive test result")
    }

    /// Probe every member of a pool on demand.
    pub async fn test_pool(&self, id: PoolId) -> Result<Result<Vec<Sample>, EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::TestPool { id, respond_to: tx })
            .await
            .context("failed to send TestPool command")?;
        rx.await.context("failed to receive test result")
    }

    pub async fn pause(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::Pause { respond_to: tx })
            .await
            .context("failed to send Pause command")?;
        rx.await.context("failed to receive pause ack")
    }

    pub async fn resume(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::Resume { respond_to: tx })
            .await
            .context("failed to send Resume command")?;
        rx.await.context("failed to receive resume ack")
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::GetStatus { respond_to: tx })
            .await
            .context("failed to send GetStatus command")?;
        rx.await.context("failed to receive status")
    }

    pub async fn monitor_config(&self) -> Result<MonitorConfig> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::GetMonitorConfig { respond_to: tx })
            .await
            .context("failed to send GetMonitorConfig command")?;
        rx.await.context("failed to receive config")
    }

    pub async fn update_monitor_config(
        &self,
        config: MonitorConfig,
    ) -> Result<Result<(), ConfigError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::UpdateMonitorConfig {
                config,
                respond_to: tx,
            })
            .await
            .context("failed to send UpdateMonitorConfig command")?;
        rx.await.context("failed to receive config ack")
    }

    pub async fn alert_config(&self) -> Result<AlertConfig> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::GetAlertConfig { respond_to: tx })
            .await
            .context("failed to send GetAlertConfig command")?;
        rx.await.context("failed to receive alert config")
    }

    pub async fn update_alert_config(
        &self,
        config: AlertConfig,
    ) -> Result<Result<(), ConfigError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::UpdateAlertConfig {
                config,
                respond_to: tx,
            })
            .await
            .context("failed to send UpdateAlertConfig command")?;
        rx.await.context("failed to receive alert config ack")
    }

    pub async fn alerts(&self, open_only: bool) -> Result<Vec<Alert>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::GetAlerts {
                open_only,
                respond_to: tx,
            })
            .await
            .context("failed to send GetAlerts command")?;
        rx.await.context("failed to receive alerts")
    }

    pub async fn alert(&self, id: AlertId) -> Result<Option<Alert>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::GetAlert { id, respond_to: tx })
            .await
            .context("failed to send GetAlert command")?;
        rx.await.context("failed to receive alert")
    }

    pub async fn alert_action(
        &self,
        id: AlertId,
        action: AlertAction,
    ) -> Result<Result<Alert, AlertError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::AlertAction {
                id,
                action,
                respond_to: tx,
            })
            .await
            .context("failed to send AlertAction command")?;
        rx.await.context("failed to receive alert action result")
    }

    pub async fn server_stats(&self, id: ServerId) -> Result<Result<WindowStats, EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::ServerStats { id, respond_to: tx })
            .await
            .context("failed to send ServerStats command")?;
        rx.await.context("failed to receive server stats")
    }

    pub async fn pool_stats(&self, id: PoolId) -> Result<Result<WindowStats, EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::PoolStats { id, respond_to: tx })
            .await
            .context("failed to send PoolStats command")?;
        rx.await.context("failed to receive pool stats")
    }

    /// Gracefully shut the engine down.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(EngineCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
