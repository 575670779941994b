use super::{Check, MonitorEvent, MonitorHandle, MonitorStatus, StatusMonitor};
use crate::error::Result;
use crate::instance::Instance;
use crate::registrar::{Heartbeat, Registrar};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// 注册失败后的重试间隔
    pub retry_interval: Duration,
    /// 监控事件通道容量
    pub event_buffer: usize,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(1),
            event_buffer: 1,
        }
    }
}

impl RegisterConfig {
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// 带健康检查的服务注册
///
/// 实例仅在健康检查为 Up 时注册到注册中心，Down 时注销。
pub struct HealthRegistration {
    pub registrar: Arc<dyn Registrar>,
    pub service: String,
    pub instance: Instance,
    pub check: Arc<dyn Check>,
    pub monitor: Arc<dyn StatusMonitor>,
    /// 可选的事件观察者，每个事件在对应状态变更完成后按序转发
    pub events: Option<mpsc::Sender<MonitorEvent>>,
    pub config: RegisterConfig,
}

impl HealthRegistration {
    pub fn new(
        registrar: impl Registrar,
        service: impl Into<String>,
        instance: Instance,
        check: impl Check,
        monitor: impl StatusMonitor,
    ) -> Self {
        Self {
            registrar: Arc::new(registrar),
            service: service.into(),
            instance,
            check: Arc::new(check),
            monitor: Arc::new(monitor),
            events: None,
            config: RegisterConfig::default(),
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<MonitorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_config(mut self, config: RegisterConfig) -> Self {
        self.config = config;
        self
    }

    /// 启动监控并返回心跳句柄，需在 tokio 运行时内调用
    pub fn register(self) -> HealthHeartbeat {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let shared = Arc::new(Shared {
            registrar: self.registrar,
            service: self.service,
            addr: self.instance.addr.clone(),
            retry_interval: self.config.retry_interval,
            generation: AtomicU64::new(0),
            state: Mutex::new(State {
                instance: self.instance,
                heartbeat: None,
            }),
        });

        let monitor = self.monitor.run(self.check, tx);
        info!("monitoring {} instance at {}", shared.service, shared.addr);
        tokio::spawn(run_events(shared.clone(), rx, monitor.clone(), self.events));

        HealthHeartbeat { shared, monitor }
    }
}

struct State {
    instance: Instance,
    heartbeat: Option<Box<dyn Heartbeat>>,
}

struct Shared {
    registrar: Arc<dyn Registrar>,
    service: String,
    addr: String,
    retry_interval: Duration,
    /// 注册尝试的代数，每次 Up、Down 或关闭都会前进，旧代数的尝试即被取消
    generation: AtomicU64,
    state: Mutex<State>,
}

impl Shared {
    fn cancel(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn on_up(self: &Arc<Self>) {
        let generation = self.cancel();
        let shared = self.clone();
        tokio::spawn(async move { shared.register(generation).await });
    }

    async fn on_down(&self) {
        self.cancel();
        let mut state = self.state.lock().await;
        if let Some(heartbeat) = state.heartbeat.take() {
            info!("deregistering {} instance at {}", self.service, self.addr);
            if let Err(e) = heartbeat.close().await {
                warn!("failed to deregister {} instance at {}: {}", self.service, self.addr, e);
            }
        }
    }

    async fn register(&self, generation: u64) {
        loop {
            if !self.is_current(generation) {
                return;
            }
            {
                let mut state = self.state.lock().await;
                if state.heartbeat.is_some() || !self.is_current(generation) {
                    return;
                }
                match self.registrar.register_instance(&self.service, &state.instance).await {
                    Ok(heartbeat) => {
                        // 等待期间状态可能已翻转，过期的注册不能留下
                        if self.is_current(generation) {
                            info!("registered {} instance at {}", self.service, self.addr);
                            state.heartbeat = Some(heartbeat);
                            return;
                        }
                        drop(state);
                        debug!("discarding stale registration of {} instance at {}", self.service, self.addr);
                        if let Err(e) = heartbeat.close().await {
                            warn!("failed to close stale registration of {}: {}", self.service, e);
                        }
                        return;
                    }
                    Err(e) => warn!(
                        "failed to register {} instance at {}, retrying in {:?}: {}",
                        self.service, self.addr, self.retry_interval, e
                    ),
                }
            }
            sleep(self.retry_interval).await;
        }
    }
}

async fn run_events(
    shared: Arc<Shared>,
    mut rx: mpsc::Receiver<MonitorEvent>,
    monitor: MonitorHandle,
    mut observer: Option<mpsc::Sender<MonitorEvent>>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = monitor.closed() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        info!("{} instance at {} is {}", shared.service, shared.addr, event.status);
        match event.status {
            MonitorStatus::Up => shared.on_up(),
            MonitorStatus::Down => shared.on_down().await,
        }

        if let Some(tx) = &observer {
            let sent = tokio::select! {
                _ = monitor.closed() => break,
                sent = tx.send(event) => sent,
            };
            if sent.is_err() {
                debug!("event observer dropped");
                observer = None;
            }
        }
    }

    // 关闭后不再接受任何进行中的注册，已有的心跳交由调用方处理
    shared.cancel();
    monitor.close();
    info!("stopped monitoring {} instance at {}", shared.service, shared.addr);
}

/// 受健康检查驱动的心跳
///
/// 可替代普通的 [`Heartbeat`] 使用。`close` 只停止监控，不注销当前注册。
pub struct HealthHeartbeat {
    shared: Arc<Shared>,
    monitor: MonitorHandle,
}

impl HealthHeartbeat {
    /// 当前是否持有有效注册
    pub async fn is_registered(&self) -> bool {
        self.shared.state.lock().await.heartbeat.is_some()
    }

    pub fn service(&self) -> &str {
        &self.shared.service
    }
}

#[async_trait]
impl Heartbeat for HealthHeartbeat {
    async fn set_meta(&self, meta: HashMap<String, String>) -> Result<()> {
        let mut state = self.shared.state.lock().await;
        state.instance.meta = meta.clone();
        match &state.heartbeat {
            Some(heartbeat) => heartbeat.set_meta(meta).await,
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.shared.cancel();
        self.monitor.close();
        Ok(())
    }

    fn addr(&self) -> String {
        self.shared.addr.clone()
    }
}
