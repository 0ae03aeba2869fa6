//! Failure injection tests for the balancer.

use std::time::Duration;
use reqwest::StatusCode;
use tinylb::Strategy;

mod common;

use common::{client, config, Balancer, MockBackend};

#[tokio::test]
async fn retry_hides_failing_upstream() {
    let broken = MockBackend::with_status(502).await;
    let good = MockBackend::start().await;

    let mut config = config(&[&broken, &good], Strategy::RoundRobin);
    config.retry_requests = true;
    let balancer = Balancer::start(config).await;

    let res = client().get(balancer.url("/")).send().await.expect("balancer unreachable");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), good.greeting());

    assert_eq!(broken.hits(), 1);
    assert!(!balancer.pool.upstreams()[0].is_healthy());

    // Dead upstream is skipped without health checks bringing it back
    for _ in 0..4 {
        let res = client().get(balancer.url("/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    assert_eq!(broken.hits(), 1);
    assert_eq!(good.hits(), 5);
}

#[tokio::test]
async fn failure_passes_through_without_retry() {
    let broken = MockBackend::with_status(500).await;
    let good = MockBackend::start().await;

    let balancer = Balancer::start(config(&[&broken, &good], Strategy::RoundRobin)).await;

    let res = client().get(balancer.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), broken.greeting());
    assert_eq!(good.hits(), 0);

    let res = client().get(balancer.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), good.greeting());
}

#[tokio::test]
async fn every_upstream_failing_is_unavailable() {
    let first = MockBackend::with_status(503).await;
    let second = MockBackend::with_status(500).await;

    let mut config = config(&[&first, &second], Strategy::RoundRobin);
    config.retry_requests = true;
    let balancer = Balancer::start(config).await;

    let res = client().get(balancer.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(first.hits() + second.hits(), 2);

    let res = client().get(balancer.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(first.hits() + second.hits(), 2);
}

#[tokio::test]
async fn unreachable_upstream_is_marked_dead() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);
    let good = MockBackend::start().await;

    let mut config = config(&[&good], Strategy::RoundRobin);
    config.servers.insert(
        0,
        tinylb::config::UpstreamConfig { url: format!("http://{}", dead_addr), weight: 1 },
    );
    config.retry_requests = true;
    let balancer = Balancer::start(config).await;

    let res = client().get(balancer.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!balancer.pool.upstreams()[0].is_healthy());
}

#[tokio::test]
async fn empty_pool_is_unavailable() {
    let balancer = Balancer::start(config(&[], Strategy::LeastConnections)).await;

    let res = client().get(balancer.url("/anything")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "No healthy upstreams");
}

#[tokio::test]
async fn health_checks_evict_and_restore() {
    let stable = MockBackend::start().await;
    let flaky = MockBackend::start().await;

    let mut config = config(&[&stable, &flaky], Strategy::RoundRobin);
    config.health_check.enabled = true;
    config.health_check.interval = "100ms".to_string();
    config.health_check.timeout = "500ms".to_string();
    let balancer = Balancer::start(config).await;

    for _ in 0..4 {
        client().get(balancer.url("/")).send().await.unwrap();
    }
    assert_eq!(stable.hits(), 2);
    assert_eq!(flaky.hits(), 2);

    flaky.set_status(500);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!balancer.pool.upstreams()[1].is_healthy());

    for _ in 0..6 {
        let res = client().get(balancer.url("/")).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), stable.greeting());
    }
    assert_eq!(flaky.hits(), 2);

    flaky.set_status(200);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(balancer.pool.upstreams()[1].is_healthy());

    for _ in 0..4 {
        client().get(balancer.url("/")).send().await.unwrap();
    }
    assert!(flaky.hits() > 2, "flaky upstream should be back in rotation");
}

#[tokio::test]
async fn ip_hashing_sticks_and_fails_over() {
    let backends = [
        MockBackend::start().await,
        MockBackend::start().await,
        MockBackend::start().await,
    ];
    let refs: Vec<&MockBackend> = backends.iter().collect();

    let mut config = config(&refs, Strategy::IpHashing);
    config.retry_requests = true;
    let balancer = Balancer::start(config).await;

    let mut bodies = Vec::new();
    for _ in 0..5 {
        let res = client().get(balancer.url("/")).send().await.unwrap();
        bodies.push(res.text().await.unwrap());
    }
    bodies.dedup();
    assert_eq!(bodies.len(), 1, "one client should always land on one upstream");

    let home = backends.iter().position(|b| b.greeting() == bodies[0]).unwrap();
    backends[home].set_status(500);

    let res = client().get(balancer.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), backends[(home + 1) % 3].greeting());
}
