//! 健康检查驱动的服务注册
//!
//! [`HealthRegistration`] 监听实例的健康状态：Up 时通过 [`Registrar`] 注册（失败按固定间隔重试），
//! Down 时注销。返回的 [`HealthHeartbeat`] 本身实现了 [`Heartbeat`]，可直接替代普通的注册句柄。

pub mod error;
pub mod health;
pub mod instance;
pub mod registrar;
pub mod registry;

pub use error::{DiscoverError, Result};
pub use health::{
    Check, CheckFunc, HealthHeartbeat, HealthRegistration, Monitor, MonitorConfig, MonitorEvent,
    MonitorHandle, MonitorStatus, RegisterConfig, StatusMonitor,
};
pub use instance::Instance;
pub use registrar::{Heartbeat, HeartbeatConfig, Registrar, RegistryHeartbeat, RegistryRegistrar};
pub use registry::{LogRegistry, Registration, Registry};
