//! End-to-end flow: probe → registry → metrics → storage → events

use ntp_sentinel::balancer::BalanceMethod;
use ntp_sentinel::engine::EngineEvent;
use ntp_sentinel::storage::{MetricStore, SampleQuery};
use ntp_sentinel::{PoolStatus, ServerStatus};

use crate::helpers::*;

#[tokio::test]
async fn cycle_flows_samples_into_every_consumer() {
    let config = test_config(
        vec![server(1, "a.example.org"), server(2, "b.example.org")],
        vec![pool(vec![1, 2], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);
    rig.source
        .script(
            "a.example.org",
            vec![Step::Ok {
                response_ms: 42.0,
                offset_ms: 3.0,
            }],
        )
        .await;

    let mut events = rig.handle.subscribe();
    let report = rig.handle.check_now().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.failed, 0);

    // registry carries the latest readings
    {
        let registry = rig.registry.read().await;
        let entry = registry.server(1).unwrap();
        assert_eq!(entry.status, ServerStatus::Online);
        assert_eq!(entry.last_response_ms, Some(42.0));
        assert_eq!(entry.last_offset_ms, Some(3.0));
        assert!(entry.last_check.is_some());
    }

    // samples persisted per server
    let history = rig.store.query(1, SampleQuery::default()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response_time_ms, Some(42.0));

    // rolling stats reflect the sample
    let stats = rig.handle.server_stats(1).await.unwrap().unwrap();
    assert_eq!(stats.sample_count, 1);
    assert_eq!(stats.uptime_percent, Some(100.0));

    // a sample event per server was broadcast
    let mut sample_events = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EngineEvent::Sample(_)) {
            sample_events += 1;
        }
    }
    assert_eq!(sample_events, 2);

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn new_servers_report_no_data_instead_of_zero_uptime() {
    let config = test_config(vec![server(1, "a.example.org")], vec![]);
    let rig = spawn(&config);

    let stats = rig.handle.server_stats(1).await.unwrap().unwrap();
    assert_eq!(stats.sample_count, 0);
    assert_eq!(stats.uptime_percent, None);
    assert_eq!(stats.avg_response_ms, None);

    {
        let registry = rig.registry.read().await;
        assert_eq!(registry.server(1).unwrap().status, ServerStatus::Unknown);
    }

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn pool_stats_cover_all_members() {
    let config = test_config(
        vec![server(1, "a.example.org"), server(2, "b.example.org")],
        vec![pool(vec![1, 2], BalanceMethod::Weighted)],
    );
    let rig = spawn(&config);
    rig.source
        .script("b.example.org", vec![Step::Timeout])
        .await;

    rig.handle.check_now().await.unwrap();

    let stats = rig.handle.pool_stats(1).await.unwrap().unwrap();
    assert_eq!(stats.sample_count, 2);
    assert_eq!(stats.success_count, 1);
    assert_eq!(stats.uptime_percent, Some(50.0));

    // the failing member has not been probed successfully yet, so the
    // pool serves from the healthy one and stays active
    {
        let registry = rig.registry.read().await;
        assert_eq!(registry.pool(1).unwrap().status, PoolStatus::Active);
    }

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn interval_change_takes_effect_through_config_update() {
    let config = test_config(vec![server(1, "a.example.org")], vec![]);
    let rig = spawn(&config);

    let mut updated = rig.handle.monitor_config().await.unwrap();
    updated.sync_interval_secs = 30;
    rig.handle
        .update_monitor_config(updated)
        .await
        .unwrap()
        .unwrap();

    let status = rig.handle.status().await.unwrap();
    assert_eq!(status.interval_secs, 30);

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn paused_engine_still_accepts_manual_checks() {
    let config = test_config(vec![server(1, "a.example.org")], vec![]);
    let rig = spawn(&config);

    rig.handle.pause().await.unwrap();
    assert!(rig.handle.status().await.unwrap().paused);

    let report = rig.handle.check_now().await.unwrap();
    assert_eq!(report.checked, 1);

    rig.handle.resume().await.unwrap();
    assert!(!rig.handle.status().await.unwrap().paused);

    rig.handle.shutdown().await.unwrap();
}
