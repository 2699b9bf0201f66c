//! Clock sync decisions driven by full cycles

use ntp_sentinel::alerts::{RuleKind, Severity};
use ntp_sentinel::balancer::BalanceMethod;
use ntp_sentinel::engine::EngineHandle;
use ntp_sentinel::probe::{ClockControl, CorrectionError};
use ntp_sentinel::registry::Registry;
use ntp_sentinel::storage::{MemoryStore, MetricStore};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::helpers::*;

#[tokio::test]
async fn offset_within_tolerance_is_left_alone() {
    let config = test_config(
        vec![server(1, "a.example.org")],
        vec![pool(vec![1], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);

    // 4s offset, tolerance 5s
    rig.source
        .script(
            "a.example.org",
            vec![Step::Ok {
                response_ms: 20.0,
                offset_ms: 4000.0,
            }],
        )
        .await;
    rig.handle.check_now().await.unwrap();

    assert!(rig.clock.corrections.lock().await.is_empty());

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn offset_beyond_tolerance_corrects_the_clock() {
    let config = test_config(
        vec![server(1, "a.example.org")],
        vec![pool(vec![1], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);

    rig.source
        .script(
            "a.example.org",
            vec![Step::Ok {
                response_ms: 20.0,
                offset_ms: 9000.0,
            }],
        )
        .await;
    rig.handle.check_now().await.unwrap();

    let corrections = rig.clock.corrections.lock().await;
    assert_eq!(corrections.as_slice(), &[9000.0]);

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn correction_records_a_zero_offset_sample() {
    let config = test_config(
        vec![server(1, "a.example.org")],
        vec![pool(vec![1], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);

    rig.source
        .script(
            "a.example.org",
            vec![Step::Ok {
                response_ms: 20.0,
                offset_ms: 9000.0,
            }],
        )
        .await;
    rig.handle.check_now().await.unwrap();

    let latest = rig.store.latest(1).await.unwrap().unwrap();
    assert_eq!(latest.offset_ms, Some(0.0));
    assert!(latest.success);

    let status = rig.handle.status().await.unwrap();
    assert!(status.last_sync.is_some());

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn privilege_denied_raises_critical_alert_without_retries() {
    struct DeniedClock {
        attempts: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl ClockControl for DeniedClock {
        async fn apply_correction(&self, _offset_ms: f64) -> Result<(), CorrectionError> {
            self.attempts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(CorrectionError::PermissionDenied)
        }
    }

    let config = test_config(
        vec![server(1, "a.example.org")],
        vec![pool(vec![1], BalanceMethod::RoundRobin)],
    );
    let registry = Arc::new(RwLock::new(Registry::from_config(&config).unwrap()));
    let source = Arc::new(ScriptedTimeSource::new());
    let clock = Arc::new(DeniedClock {
        attempts: std::sync::atomic::AtomicU32::new(0),
    });
    let handle = EngineHandle::spawn(
        &config,
        registry,
        source.clone(),
        clock.clone(),
        Arc::new(MemoryStore::new()) as Arc<dyn MetricStore>,
    );

    source
        .script(
            "a.example.org",
            vec![Step::Ok {
                response_ms: 20.0,
                offset_ms: 9000.0,
            }],
        )
        .await;
    handle.check_now().await.unwrap();

    // no retry happens on a privilege failure
    assert_eq!(clock.attempts.load(std::sync::atomic::Ordering::SeqCst), 1);

    let alerts = handle.alerts(true).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].rule, RuleKind::Privilege);
    assert_eq!(alerts[0].severity, Severity::Critical);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn successful_sync_clears_open_sync_alerts() {
    struct HealingClock {
        fail_first: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ClockControl for HealingClock {
        async fn apply_correction(&self, _offset_ms: f64) -> Result<(), CorrectionError> {
            if self.fail_first.swap(false, std::sync::atomic::Ordering::SeqCst) {
                Err(CorrectionError::PermissionDenied)
            } else {
                Ok(())
            }
        }
    }

    let config = test_config(
        vec![server(1, "a.example.org")],
        vec![pool(vec![1], BalanceMethod::RoundRobin)],
    );
    let registry = Arc::new(RwLock::new(Registry::from_config(&config).unwrap()));
    let source = Arc::new(ScriptedTimeSource::new());
    let clock = Arc::new(HealingClock {
        fail_first: std::sync::atomic::AtomicBool::new(true),
    });
    let handle = EngineHandle::spawn(
        &config,
        registry,
        source.clone(),
        clock,
        Arc::new(MemoryStore::new()) as Arc<dyn MetricStore>,
    );

    let drift = Step::Ok {
        response_ms: 20.0,
        offset_ms: 9000.0,
    };
    source
        .script("a.example.org", vec![drift.clone(), drift])
        .await;

    handle.check_now().await.unwrap();
    assert_eq!(handle.alerts(true).await.unwrap().len(), 1);

    handle.check_now().await.unwrap();
    assert!(handle.alerts(true).await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
}
