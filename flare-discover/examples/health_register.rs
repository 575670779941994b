use flare_discover::{
    CheckFunc, DiscoverError, HealthRegistration, Heartbeat, HeartbeatConfig, Instance, LogRegistry,
    Monitor, MonitorConfig, RegistryRegistrar,
};
use log::info;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    let registrar = RegistryRegistrar::new(
        LogRegistry::new(),
        HeartbeatConfig::default().with_interval(Duration::from_secs(1)),
    );

    // 模拟一个每隔几次检查就失败一段时间的服务
    let probes = Arc::new(AtomicU32::new(0));
    let check = CheckFunc::new(move || {
        let probes = probes.clone();
        async move {
            let n = probes.fetch_add(1, Ordering::SeqCst);
            if (n / 5) % 2 == 1 {
                Err(DiscoverError::check(format!("probe {} failed", n)))
            } else {
                Ok(())
            }
        }
    });

    let monitor = Monitor::new(
        MonitorConfig::default()
            .with_interval(Duration::from_millis(500))
            .with_threshold(2),
    );

    let (events_tx, mut events) = mpsc::channel(16);
    let instance = Instance::new("127.0.0.1:8080").with_meta("version", "1.0.0");
    let hb = HealthRegistration::new(registrar, "echo", instance, check, monitor)
        .with_events(events_tx)
        .register();

    let observer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("observed status: {}", event.status);
        }
    });

    tokio::time::sleep(Duration::from_secs(3)).await;
    hb.set_meta(HashMap::from([("version".to_string(), "1.0.1".to_string())]))
        .await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = tokio::time::sleep(Duration::from_secs(10)) => {},
    }
    info!("Shutting down gracefully...");
    hb.close().await?;
    observer.await?;
    Ok(())
}
