//! Balancing behavior across full engine cycles

use ntp_sentinel::balancer::BalanceMethod;

use crate::helpers::*;

#[tokio::test]
async fn round_robin_rotates_across_cycles() {
    let config = test_config(
        vec![
            server(1, "a.example.org"),
            server(2, "b.example.org"),
            server(3, "c.example.org"),
        ],
        vec![pool(vec![1, 2, 3], BalanceMethod::RoundRobin)],
    );
    let rig = spawn(&config);

    let mut picks = Vec::new();
    for _ in 0..6 {
        rig.handle.check_now().await.unwrap();
        let registry = rig.registry.read().await;
        picks.push(registry.pool(1).unwrap().selected.unwrap());
    }
    assert_eq!(picks, vec![1, 2, 3, 1, 2, 3]);

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn response_time_method_follows_the_fastest_member() {
    let config = test_config(
        vec![server(1, "a.example.org"), server(2, "b.example.org")],
        vec![pool(vec![1, 2], BalanceMethod::ResponseTime)],
    );
    let rig = spawn(&config);

    // server 2 consistently faster
    for _ in 0..3 {
        rig.source
            .script(
                "a.example.org",
                vec![Step::Ok {
                    response_ms: 80.0,
                    offset_ms: 1.0,
                }],
            )
            .await;
        rig.source
            .script(
                "b.example.org",
                vec![Step::Ok {
                    response_ms: 10.0,
                    offset_ms: 1.0,
                }],
            )
            .await;
        rig.handle.check_now().await.unwrap();
    }

    {
        let registry = rig.registry.read().await;
        assert_eq!(registry.pool(1).unwrap().selected, Some(2));
    }

    rig.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn weighted_method_only_selects_reachable_members() {
    let config = {
        let mut heavy = server(1, "a.example.org");
        heavy.weight = 100.0;
        test_config(
            vec![heavy, server(2, "b.example.org")],
            vec![pool(vec![1, 2], BalanceMethod::Weighted)],
        )
    };
    let rig = spawn(&config);

    // the heavy member is down the whole time
    rig.source
        .script(
            "a.example.org",
            (0..5).map(|_| Step::Unreachable).collect(),
        )
        .await;

    for _ in 0..5 {
        rig.handle.check_now().await.unwrap();
        let registry = rig.registry.read().await;
        assert_eq!(registry.pool(1).unwrap().selected, Some(2));
    }

    rig.handle.shutdown().await.unwrap();
}
