//! End-to-end tests of the sensor subscriber over Zenoh.
//!
//! A peer session listening on loopback plays the MQTT bridge; the
//! subscriber attaches to it as a client, the same way a `BROKER` endpoint
//! is used in deployment. Pushes land in a local HTTP sink.
//!
//! Note: Zenoh requires multi-thread tokio runtime.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::any;
use flate2::read::GzDecoder;
use tankmon_bridge::{DeviceGauges, DeviceProfile, SensorSubscriber};
use tankmon_common::{ZenohConfig, ZenohMode};
use tankmon_push::{GaugeRegistry, PushRequest, Pusher};
use tokio::sync::{mpsc, watch};

const IMPORT_PATH: &str = "/api/v1/import/prometheus";

/// Unique sensor name so concurrent test processes never share keys.
fn unique_sensor() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("tank_{}", nanos)
}

/// A loopback locator on a port nothing listens on yet.
fn free_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    format!("tcp/127.0.0.1:{}", port)
}

async fn sink_handler(
    State(tx): State<mpsc::UnboundedSender<String>>,
    body: Bytes,
) -> StatusCode {
    let mut text = String::new();
    GzDecoder::new(&body[..])
        .read_to_string(&mut text)
        .expect("body is not gzip");
    let _ = tx.send(text);
    StatusCode::NO_CONTENT
}

async fn start_sink() -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let router = Router::new()
        .route(IMPORT_PATH, any(sink_handler))
        .with_state(tx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, rx)
}

/// Peer session listening on `endpoint`, standing in for the MQTT bridge.
async fn open_broker(endpoint: &str) -> zenoh::Session {
    let config = ZenohConfig {
        mode: ZenohMode::Peer,
        connect: Vec::new(),
        listen: vec![endpoint.to_string()],
    };
    tankmon_common::connect(&config)
        .await
        .expect("Failed to open broker session")
}

fn tank_subscriber(
    sensor: &str,
    sink: SocketAddr,
    endpoint: &str,
) -> (Arc<GaugeRegistry>, SensorSubscriber) {
    let registry = Arc::new(GaugeRegistry::new());
    let gauges = DeviceGauges::register(&registry, DeviceProfile::Tank).unwrap();
    let request = PushRequest::new(
        &format!("http://{}{}", sink, IMPORT_PATH),
        Duration::from_secs(5),
        &format!("sensor=\"{}\"", sensor),
        false,
    )
    .unwrap();

    let subscriber = SensorSubscriber::new(
        gauges,
        Pusher::new(registry.clone()),
        request,
        ZenohConfig::client(endpoint),
        format!("tele/{}/SENSOR", sensor),
    );
    (registry, subscriber)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sensor_message_is_pushed() {
    let (sink, mut rx) = start_sink().await;
    let endpoint = free_endpoint();
    let broker = open_broker(&endpoint).await;

    let sensor = unique_sensor();
    let key = format!("tele/{}/SENSOR", sensor);
    let (registry, subscriber) = tank_subscriber(&sensor, sink, &endpoint);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(subscriber.run(shutdown_rx));

    // The subscriber declares itself asynchronously; publish until a push arrives.
    let payload = br#"{"Distance": 1000, "Temperature": 21.5, "Humidity": 40}"#.to_vec();
    let body = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            broker
                .put(&key, payload.clone())
                .await
                .expect("Failed to publish");
            let received = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
            if let Ok(Some(body)) = received {
                break body;
            }
        }
    })
    .await
    .expect("Timeout waiting for push");

    assert!(body.contains(&format!("distance{{sensor=\"{}\"}} 1000\n", sensor)));
    assert!(body.contains(&format!("humidity{{sensor=\"{}\"}} 40\n", sensor)));
    assert_eq!(registry.gauge("temperature").unwrap().get(), 21.5);

    // Drain pushes from repeated publishes before checking deletes.
    tokio::time::sleep(Duration::from_millis(500)).await;
    while rx.try_recv().is_ok() {}

    broker.delete(&key).await.expect("Failed to delete");
    let pushed = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
    assert!(pushed.is_err(), "delete sample must not trigger a push");

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("Subscriber did not stop")
        .expect("Subscriber panicked");
    assert!(result.is_ok());

    broker.close().await.expect("Failed to close session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_undecodable_message_is_not_pushed() {
    let (sink, mut rx) = start_sink().await;
    let endpoint = free_endpoint();
    let broker = open_broker(&endpoint).await;

    let sensor = unique_sensor();
    let key = format!("tele/{}/SENSOR", sensor);
    let (registry, subscriber) = tank_subscriber(&sensor, sink, &endpoint);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(subscriber.run(shutdown_rx));

    // Wait until the subscriber is live by getting one valid reading through.
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            broker
                .put(&key, br#"{"Distance": 5}"#.to_vec())
                .await
                .expect("Failed to publish");
            let received = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
            if let Ok(Some(_)) = received {
                break;
            }
        }
    })
    .await
    .expect("Timeout waiting for push");

    tokio::time::sleep(Duration::from_millis(500)).await;
    while rx.try_recv().is_ok() {}

    broker
        .put(&key, b"Offline".to_vec())
        .await
        .expect("Failed to publish");
    let pushed = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
    assert!(pushed.is_err(), "undecodable payload must not trigger a push");
    assert_eq!(registry.gauge("distance").unwrap().get(), 5.0);

    shutdown_tx.send(true).unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    broker.close().await.expect("Failed to close session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_zenoh_settings_fail_fast() {
    let registry = Arc::new(GaugeRegistry::new());
    let gauges = DeviceGauges::register(&registry, DeviceProfile::Tank).unwrap();
    let request =
        PushRequest::new("http://127.0.0.1:9/", Duration::from_secs(1), "", false).unwrap();
    let subscriber = SensorSubscriber::new(
        gauges,
        Pusher::new(registry.clone()),
        request,
        ZenohConfig {
            mode: ZenohMode::Client,
            ..Default::default()
        },
        "tele/tank1/SENSOR",
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let result = tokio::time::timeout(Duration::from_secs(5), subscriber.run(shutdown_rx))
        .await
        .expect("run should fail without opening a session");
    assert!(result.is_err());
}
