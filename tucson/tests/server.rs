use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tucson::serve_with_shutdown;

async fn start(
    router: Router,
    grace: Duration,
) -> (
    String,
    oneshot::Sender<()>,
    tokio::task::JoinHandle<Result<(), tucson::GatewayError>>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(serve_with_shutdown(
        router,
        listener,
        async move {
            let _ = rx.await;
        },
        grace,
    ));
    (base, tx, handle)
}

#[tokio::test]
async fn serves_until_shutdown() {
    let router = Router::new().route("/ping", get(|| async { "pong" }));
    let (base, stop, handle) = start(router, Duration::from_secs(5)).await;

    let body = reqwest::get(format!("{base}/ping"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "pong");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn slow_requests_are_abandoned_after_grace() {
    let router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "late"
        }),
    );
    let (base, stop, handle) = start(router, Duration::from_millis(200)).await;

    let pending = tokio::spawn(reqwest::get(format!("{base}/slow")));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    pending.abort();
}
