//! Sensor telemetry bridge.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use tankmon_bridge::{BridgeArgs, BridgeConfig, DeviceGauges, SensorSubscriber};
use tankmon_push::{GaugeRegistry, PushRequest, Pusher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = BridgeArgs::parse();
    let config = BridgeConfig::from_args(&args)?;

    tankmon_common::init_tracing(&config.logging)?;

    let labels = config.extra_labels()?;
    let request = PushRequest::from_config(&config.push, labels)?;

    info!(
        sensor = %config.sensor.name,
        profile = %config.sensor.profile,
        push_url = %request.redacted_url(),
        "Starting tankmon bridge"
    );

    let registry = Arc::new(GaugeRegistry::new());
    let gauges = DeviceGauges::register(&registry, config.sensor.profile)?;
    let pusher = Pusher::new(registry.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let subscriber = SensorSubscriber::new(
        gauges,
        pusher.clone(),
        request.clone(),
        config.zenoh.clone(),
        config.key_expr(),
    );
    let subscriber_shutdown = shutdown_rx.clone();
    let subscriber_task = tokio::spawn(async move {
        if let Err(e) = subscriber.run(subscriber_shutdown).await {
            error!("Subscriber error: {}", e);
        }
    });

    // Optional periodic push, independent of incoming messages
    let periodic_task = config.push.interval().map(|period| {
        let mut periodic_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; skip it so an empty snapshot
            // is not pushed before any reading arrives.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        drop(pusher.push_request(request.clone()));
                    }
                    _ = periodic_shutdown.changed() => {
                        if *periodic_shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = subscriber_task.await;
        if let Some(task) = periodic_task {
            let _ = task.await;
        }
    })
    .await;

    info!(series = registry.len(), "Bridge stopped");
    Ok(())
}

/// Resolves on SIGTERM. Never resolves where the signal is unavailable.
async fn terminate() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                return;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    }

    std::future::pending::<()>().await;
}
