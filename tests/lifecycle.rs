//! Startup and shutdown against a real socket.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use api_frontdoor::config::Environment;
use api_frontdoor::lifecycle::startup::BoxError;
use api_frontdoor::lifecycle::{self, ShutdownOutcome, ShutdownPolicy, Startup};

mod common;
use common::test_config;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_serves_then_shuts_down_cleanly() {
    let started = Startup::new(test_config(Environment::Production))
        .start()
        .await
        .unwrap();
    let addr = started.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let policy = ShutdownPolicy {
        grace_period: Duration::from_secs(5),
        exit_nonzero_on_cleanup_failure: true,
    };
    let server = tokio::spawn(lifecycle::serve_until(started, policy, async move {
        let _ = stop_rx.await;
    }));

    let res = client()
        .get(format!("http://{}/api/v1/", addr))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    stop_tx.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .expect("shutdown exceeded bounded grace period")
        .unwrap();

    assert_eq!(outcome, ShutdownOutcome::Clean);
    assert_eq!(policy.exit_status(&outcome), 0);
    assert!(client()
        .get(format!("http://{}/api/v1/", addr))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_idle_shutdown_exits_zero() {
    let started = Startup::new(test_config(Environment::Production))
        .start()
        .await
        .unwrap();
    let status = tokio::time::timeout(
        Duration::from_secs(10),
        lifecycle::serve_until(started, ShutdownPolicy::default(), async {}),
    )
    .await
    .map(|outcome| ShutdownPolicy::default().exit_status(&outcome))
    .expect("idle shutdown hung");

    assert_eq!(status, 0);
}

#[tokio::test]
async fn test_rate_limit_keys_on_peer_address() {
    let mut config = test_config(Environment::Production);
    config.rate_limit.max_requests = 3;
    let started = Startup::new(config).start().await.unwrap();
    let addr = started.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(lifecycle::serve_until(
        started,
        ShutdownPolicy::default(),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let client = client();
    let url = format!("http://{}/api/v1/", addr);
    for _ in 0..3 {
        assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    }
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert!(res.headers().contains_key("retry-after"));

    stop_tx.send(()).unwrap();
    assert_eq!(server.await.unwrap(), ShutdownOutcome::Clean);
}

#[tokio::test]
async fn test_bind_failure_in_production_exits_one() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config(Environment::Production);
    config.server.port = taken.local_addr().unwrap().port();

    let status = lifecycle::run_until(Startup::new(config), async {}).await;
    assert_eq!(status, 1);
}

#[tokio::test]
async fn test_startup_failure_outside_production_waits_for_signal() {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let startup = Startup::new(test_config(Environment::Development))
        .depends_on("database", async { Err::<(), BoxError>("connection refused".into()) });

    let run = tokio::spawn(lifecycle::run_until(startup, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!run.is_finished(), "should stay up until signalled");

    stop_tx.send(()).unwrap();
    assert_eq!(run.await.unwrap(), 0);
}
