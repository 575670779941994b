use super::{Heartbeat, HeartbeatConfig, Registrar};
use crate::error::{DiscoverError, Result};
use crate::instance::Instance;
use crate::registry::{Registration, Registry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 将 [`Registry`] 后端适配为 [`Registrar`]
#[derive(Clone)]
pub struct RegistryRegistrar<R: Registry> {
    registry: R,
    config: HeartbeatConfig,
}

impl<R: Registry> RegistryRegistrar<R> {
    pub fn new(registry: R, config: HeartbeatConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }
}

#[async_trait]
impl<R: Registry> Registrar for RegistryRegistrar<R> {
    async fn register_instance(&self, service: &str, inst: &Instance) -> Result<Box<dyn Heartbeat>> {
        let registration = Registration::from_instance(service, inst)?;
        self.registry
            .register(registration.clone())
            .await
            .map_err(|e| DiscoverError::registry(e.to_string()))?;
        log::debug!("registered {} instance {} at {}", service, inst.id, inst.addr);

        let heartbeat = RegistryHeartbeat {
            registry: self.registry.clone(),
            service_id: registration.id.clone(),
            addr: inst.addr.clone(),
            registration: Mutex::new(registration),
            keepalive: CancellationToken::new(),
            closed: AtomicBool::new(false),
        };
        heartbeat.start_keepalive(&self.config);
        Ok(Box::new(heartbeat))
    }
}

/// 后端注册的存活句柄，后台周期续约直到关闭
pub struct RegistryHeartbeat<R: Registry> {
    registry: R,
    service_id: String,
    addr: String,
    registration: Mutex<Registration>,
    keepalive: CancellationToken,
    closed: AtomicBool,
}

impl<R: Registry> RegistryHeartbeat<R> {
    fn start_keepalive(&self, config: &HeartbeatConfig) {
        let registry = self.registry.clone();
        let stop = self.keepalive.clone();
        let period = config.interval;
        let service_id = self.service_id.clone();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = registry.heartbeat(&service_id).await {
                            log::error!("Failed to send heartbeat for {}: {}", service_id, e);
                        }
                    }
                }
            }
            log::debug!("keepalive stopped for {}", service_id);
        });
    }
}

#[async_trait]
impl<R: Registry> Heartbeat for RegistryHeartbeat<R> {
    async fn set_meta(&self, meta: HashMap<String, String>) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DiscoverError::Closed);
        }
        let mut current = self.registration.lock().await;
        let mut updated = current.clone();
        updated.meta = meta;
        self.registry
            .register(updated.clone())
            .await
            .map_err(|e| DiscoverError::heartbeat(e.to_string()))?;
        *current = updated;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.keepalive.cancel();
        // 等待进行中的元数据更新结束
        let _registration = self.registration.lock().await;
        self.registry
            .deregister(&self.service_id)
            .await
            .map_err(|e| DiscoverError::heartbeat(e.to_string()))
    }

    fn addr(&self) -> String {
        self.addr.clone()
    }
}

impl<R: Registry> Drop for RegistryHeartbeat<R> {
    fn drop(&mut self) {
        self.keepalive.cancel();
    }
}
