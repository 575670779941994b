#[cfg(test)]
mod tests {
    use crate::error::DiscoverError;
    use crate::instance::Instance;
    use crate::registrar::{Heartbeat, HeartbeatConfig, Registrar, RegistryRegistrar};
    use crate::registry::{Registration, Registry};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// 内存注册中心
    #[derive(Clone, Default)]
    struct MemoryRegistry {
        services: Arc<Mutex<HashMap<String, Registration>>>,
        heartbeats: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    impl MemoryRegistry {
        fn get(&self, id: &str) -> Option<Registration> {
            self.services.lock().unwrap().get(id).cloned()
        }

        fn unavailable() -> std::io::Error {
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "registry unavailable")
        }
    }

    #[async_trait]
    impl Registry for MemoryRegistry {
        type Error = std::io::Error;

        async fn register(&self, registration: Registration) -> Result<(), Self::Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.services
                .lock()
                .unwrap()
                .insert(registration.id.clone(), registration);
            Ok(())
        }

        async fn deregister(&self, service_id: &str) -> Result<(), Self::Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.services.lock().unwrap().remove(service_id);
            Ok(())
        }

        async fn heartbeat(&self, _service_id: &str) -> Result<(), Self::Error> {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn instance() -> Instance {
        Instance::new("127.0.0.1:8080")
            .with_id("web-1")
            .with_meta("env", "test")
    }

    #[tokio::test]
    async fn test_register_instance() {
        let registry = MemoryRegistry::default();
        let registrar = RegistryRegistrar::new(registry.clone(), HeartbeatConfig::default());

        let hb = registrar.register_instance("web", &instance()).await.unwrap();
        assert_eq!(hb.addr(), "127.0.0.1:8080");

        let reg = registry.get("web-1").expect("instance should be registered");
        assert_eq!(reg.name, "web");
        assert_eq!(reg.port, 8080);
        assert_eq!(reg.meta.get("env").map(String::as_str), Some("test"));

        hb.close().await.unwrap();
        assert!(registry.get("web-1").is_none());
    }

    #[tokio::test]
    async fn test_register_instance_unavailable() {
        let registry = MemoryRegistry::default();
        registry.fail.store(true, Ordering::SeqCst);
        let registrar = RegistryRegistrar::new(registry.clone(), HeartbeatConfig::default());

        match registrar.register_instance("web", &instance()).await {
            Err(DiscoverError::Registry(_)) => {}
            Err(e) => panic!("expected registry error, got: {}", e),
            Ok(_) => panic!("registration should fail"),
        }
    }

    #[tokio::test]
    async fn test_register_instance_invalid_addr() {
        let registrar = RegistryRegistrar::new(MemoryRegistry::default(), HeartbeatConfig::default());
        let inst = Instance::new("nowhere");
        assert!(matches!(
            registrar.register_instance("web", &inst).await,
            Err(DiscoverError::InvalidAddr(_))
        ));
    }

    #[tokio::test]
    async fn test_set_meta() {
        let registry = MemoryRegistry::default();
        let registrar = RegistryRegistrar::new(registry.clone(), HeartbeatConfig::default());
        let hb = registrar.register_instance("web", &instance()).await.unwrap();

        let meta = HashMap::from([("k".to_string(), "v".to_string())]);
        hb.set_meta(meta.clone()).await.unwrap();
        assert_eq!(registry.get("web-1").unwrap().meta, meta);

        // 注册中心不可用时，已发布的元数据保持不变
        registry.fail.store(true, Ordering::SeqCst);
        let other = HashMap::from([("k".to_string(), "other".to_string())]);
        assert!(matches!(
            hb.set_meta(other).await,
            Err(DiscoverError::Heartbeat(_))
        ));
        assert_eq!(registry.get("web-1").unwrap().meta, meta);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let registry = MemoryRegistry::default();
        let registrar = RegistryRegistrar::new(registry.clone(), HeartbeatConfig::default());
        let hb = registrar.register_instance("web", &instance()).await.unwrap();

        hb.close().await.unwrap();
        hb.close().await.unwrap();
        assert!(matches!(
            hb.set_meta(HashMap::new()).await,
            Err(DiscoverError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_until_close() {
        let registry = MemoryRegistry::default();
        let config = HeartbeatConfig::default().with_interval(Duration::from_secs(5));
        let registrar = RegistryRegistrar::new(registry.clone(), config);
        let hb = registrar.register_instance("web", &instance()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        let sent = registry.heartbeats.load(Ordering::SeqCst);
        assert_eq!(sent, 2);

        hb.close().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(registry.heartbeats.load(Ordering::SeqCst), sent);
    }
}
