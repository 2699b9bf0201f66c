//! Failure handling: offline transitions, recovery, and alert debounce

use ntp_sentinel::alerts::{AlertStatus, RuleKind};
use ntp_sentinel::balancer::BalanceMethod;
use ntp_sentinel::ServerStatus;

use crate::helpers::*;

#[tokio::test]
async fn server_goes_offline_after_consecutive_failures() {
    let config = test_config(vec![server(1, "a.example.org")], vec![]);
    let rig = spawn(&config);
    rig.source
        .script(
            "a.example.org",
            vec![Step::Timeout, Step::Timeout, Step::Timeout],
        )
        .await;

    // two failures keep the last known status
    for _ in 0..2 {
        rig.handle.check_now().await.unwrap();
        let registry = rig.registry.read().await;
        assert_ne!(registry.server(1).unwrap().status, ServerStatus::Offline);
    }

    // third consecutive failure takes the server offline
    rig.handle.check_now().await.unwrap();
    {
        let registry = rig.registry.read().await;
        assert_eq!(registry.server(1).unwrap().status, ServerStatus::Offline);
    }

    // a single success brings it back
    rig.handle.check_now().await.unwrap();
    {
        let registry = rig.registry.read().await;
        assert_eq!(registry.server(1).unwrap().status, ServerStatus::Online);
    }

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_pool_yields_no_selection() {
    let config = test_config(
        vec![server(1, "a.example.org")],
        vec![pool(vec![1], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);
    rig.source
        .script(
            "a.example.org",
            vec![
                Step::Unreachable,
                Step::Unreachable,
                Step::Unreachable,
            ],
        )
        .await;

    for _ in 0..3 {
        rig.handle.check_now().await.unwrap();
    }

    {
        let registry = rig.registry.read().await;
        let pool = registry.pool(1).unwrap();
        assert_eq!(pool.status, ntp_sentinel::PoolStatus::Failed);
        assert_eq!(pool.selected, None);
    }

    // the dead pool raises exactly one alert of its own
    let alerts = rig.handle.alerts(true).await.unwrap();
    let pool_alerts: Vec<_> = alerts
        .iter()
        .filter(|a| a.rule == RuleKind::PoolHealth)
        .collect();
    assert_eq!(pool_alerts.len(), 1);

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn response_time_alert_debounces_and_resolves() {
    let config = test_config(vec![server(1, "a.example.org")], vec![]);
    let rig = spawn(&config);

    let slow = Step::Ok {
        response_ms: 1500.0,
        offset_ms: 1.0,
    };
    rig.source
        .script("a.example.org", vec![slow.clone(), slow.clone()])
        .await;

    // two breaches stay below the debounce count
    for _ in 0..2 {
        rig.handle.check_now().await.unwrap();
    }
    assert!(rig.handle.alerts(true).await.unwrap().is_empty());

    // third breach opens the alert
    rig.source.script("a.example.org", vec![slow]).await;
    rig.handle.check_now().await.unwrap();
    let alerts = rig.handle.alerts(true).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].rule, RuleKind::ResponseTime);
    let id = alerts[0].id;

    // healthy readings auto-resolve it after the same streak length
    for _ in 0..3 {
        rig.handle.check_now().await.unwrap();
    }
    let alert = rig.handle.alert(id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert!(rig.handle.alerts(true).await.unwrap().is_empty());

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_spike_does_not_alert() {
    let config = test_config(vec![server(1, "a.example.org")], vec![]);
    let rig = spawn(&config);
    rig.source
        .script(
            "a.example.org",
            vec![Step::Ok {
                response_ms: 4000.0,
                offset_ms: 1.0,
            }],
        )
        .await;

    for _ in 0..5 {
        rig.handle.check_now().await.unwrap();
    }
    assert!(rig.handle.alerts(true).await.unwrap().is_empty());

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn pool_with_offline_member_serves_healthy_and_stays_active() {
    let config = test_config(
        vec![server(1, "a.example.org"), server(2, "b.example.org")],
        vec![pool(vec![1, 2], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);
    rig.source
        .script(
            "b.example.org",
            vec![
                Step::Unreachable,
                Step::Unreachable,
                Step::Unreachable,
                Step::Unreachable,
            ],
        )
        .await;

    for _ in 0..4 {
        rig.handle.check_now().await.unwrap();
        let registry = rig.registry.read().await;
        let pool = registry.pool(1).unwrap();
        // member 2 is never selected while it is failing
        assert_ne!(pool.selected, Some(2));
    }

    // the healthy selection keeps the pool active despite the dead member
    {
        let registry = rig.registry.read().await;
        let pool = registry.pool(1).unwrap();
        assert_eq!(pool.status, ntp_sentinel::PoolStatus::Active);
        assert_eq!(pool.selected, Some(1));
    }

    rig.handle.shutdown().await.unwrap();
}
