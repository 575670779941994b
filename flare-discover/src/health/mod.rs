mod monitor;
mod register;

pub use monitor::{Monitor, MonitorConfig};
pub use register::{HealthHeartbeat, HealthRegistration, RegisterConfig};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 健康检查
#[async_trait]
pub trait Check: Send + Sync + 'static {
    async fn check(&self) -> Result<()>;
}

/// 由闭包构造的健康检查
pub struct CheckFunc<F> {
    f: F,
}

impl<F, Fut> CheckFunc<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Check for CheckFunc<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn check(&self) -> Result<()> {
        (self.f)().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorStatus {
    Up,
    Down,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
        }
    }
}

/// 状态变化事件
#[derive(Clone)]
pub struct MonitorEvent {
    pub check: Arc<dyn Check>,
    pub status: MonitorStatus,
}

impl MonitorEvent {
    pub fn new(check: Arc<dyn Check>, status: MonitorStatus) -> Self {
        Self { check, status }
    }
}

impl fmt::Debug for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorEvent")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// 监控事件源的停止句柄
///
/// 关闭后事件源必须停止发送并释放其 `Sender`，消费方由此观察到事件流结束。
#[derive(Debug, Clone, Default)]
pub struct MonitorHandle {
    token: CancellationToken,
}

impl MonitorHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 等待句柄被关闭
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}

/// 状态监控器：持续执行检查并把 Up/Down 变化写入 `events`
pub trait StatusMonitor: Send + Sync + 'static {
    fn run(&self, check: Arc<dyn Check>, events: mpsc::Sender<MonitorEvent>) -> MonitorHandle;
}

impl<F> StatusMonitor for F
where
    F: Fn(Arc<dyn Check>, mpsc::Sender<MonitorEvent>) -> MonitorHandle + Send + Sync + 'static,
{
    fn run(&self, check: Arc<dyn Check>, events: mpsc::Sender<MonitorEvent>) -> MonitorHandle {
        self(check, events)
    }
}
