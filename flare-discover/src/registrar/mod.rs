mod backend;
mod tests;

pub use backend::{RegistryHeartbeat, RegistryRegistrar};

use crate::error::Result;
use crate::instance::Instance;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 已注册实例的存活句柄
///
/// 句柄存在即表示实例正在对外提供服务。
#[async_trait]
pub trait Heartbeat: Send + Sync {
    /// 全量替换已发布的元数据
    async fn set_meta(&self, meta: HashMap<String, String>) -> Result<()>;

    /// 注销实例
    async fn close(&self) -> Result<()>;

    /// 已注册的地址
    fn addr(&self) -> String;
}

/// 向注册中心注册实例
#[async_trait]
pub trait Registrar: Send + Sync + 'static {
    async fn register_instance(&self, service: &str, inst: &Instance) -> Result<Box<dyn Heartbeat>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// 续约间隔
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

impl HeartbeatConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}
