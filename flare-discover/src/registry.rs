use crate::error::Result;
use crate::instance::Instance;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 服务注册后端接口
#[async_trait]
pub trait Registry: Send + Sync + Clone + 'static {
    type Error: std::error::Error + Send + Sync;

    /// 注册服务；对同一 id 重复注册视为更新
    async fn register(&self, registration: Registration) -> std::result::Result<(), Self::Error>;

    /// 注销服务
    async fn deregister(&self, service_id: &str) -> std::result::Result<(), Self::Error>;

    /// 服务心跳
    async fn heartbeat(&self, service_id: &str) -> std::result::Result<(), Self::Error>;
}

/// 服务注册信息
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub id: String,
    pub tags: Vec<String>,
    pub address: String,
    pub port: u16,
    pub weight: u32,
    pub meta: HashMap<String, String>,
    pub version: String,
}

impl Registration {
    pub fn new(
        name: String,
        id: String,
        tags: Vec<String>,
        address: String,
        port: u16,
        weight: u32,
        meta: HashMap<String, String>,
        version: String,
    ) -> Self {
        Self {
            name,
            id,
            tags,
            address,
            port,
            weight,
            meta,
            version,
        }
    }

    /// 由服务名和实例构造注册信息，协议作为标签发布
    pub fn from_instance(service: &str, inst: &Instance) -> Result<Self> {
        let (address, port) = inst.host_port()?;
        Ok(Self {
            name: service.to_string(),
            id: inst.id.clone(),
            tags: vec![inst.proto.clone()],
            address,
            port,
            weight: 1,
            meta: inst.meta.clone(),
            version: String::new(),
        })
    }
}

/// 默认的日志注册器实现
#[derive(Debug, Clone, Default)]
pub struct LogRegistry;

impl LogRegistry {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Registry for LogRegistry {
    type Error = std::io::Error;

    async fn register(&self, registration: Registration) -> std::result::Result<(), Self::Error> {
        log::info!("Registering service: {} (id: {})", registration.name, registration.id);
        if let Ok(record) = serde_json::to_string(&registration) {
            log::debug!("registration record: {}", record);
        }
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> std::result::Result<(), Self::Error> {
        log::info!("Deregistering service: {}", service_id);
        Ok(())
    }

    async fn heartbeat(&self, service_id: &str) -> std::result::Result<(), Self::Error> {
        log::debug!("Service heartbeat: {}", service_id);
        Ok(())
    }
}
