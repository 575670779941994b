use super::{Check, MonitorEvent, MonitorHandle, MonitorStatus, StatusMonitor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 首次 Up 之前的检查间隔
    pub start_interval: Duration,
    /// 首次 Up 之后的检查间隔
    pub interval: Duration,
    /// 首次 Up 之后，状态翻转所需的连续相同结果次数
    pub threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            start_interval: Duration::from_millis(100),
            interval: Duration::from_secs(2),
            threshold: 2,
        }
    }
}

impl MonitorConfig {
    pub fn with_start_interval(mut self, interval: Duration) -> Self {
        self.start_interval = interval;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// 默认的周期性状态监控器
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }
}

impl StatusMonitor for Monitor {
    fn run(&self, check: Arc<dyn Check>, events: mpsc::Sender<MonitorEvent>) -> MonitorHandle {
        let handle = MonitorHandle::new();
        let stop = handle.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            run_checks(config, check, events, stop).await;
        });
        handle
    }
}

async fn run_checks(
    config: MonitorConfig,
    check: Arc<dyn Check>,
    events: mpsc::Sender<MonitorEvent>,
    stop: MonitorHandle,
) {
    let mut tracker = StatusTracker::new(config.threshold);
    loop {
        let result = tokio::select! {
            _ = stop.closed() => break,
            result = check.check() => result,
        };
        if let Err(e) = &result {
            log::debug!("health check failed: {}", e);
        }

        if let Some(status) = tracker.record(result.is_ok()) {
            log::info!("health status changed to {}", status);
            let event = MonitorEvent::new(check.clone(), status);
            let sent = tokio::select! {
                _ = stop.closed() => break,
                sent = events.send(event) => sent,
            };
            if sent.is_err() {
                log::debug!("monitor event receiver dropped");
                break;
            }
        }

        let period = if tracker.status.is_some() {
            config.interval
        } else {
            config.start_interval
        };
        tokio::select! {
            _ = stop.closed() => break,
            _ = sleep(period) => {}
        }
    }
    log::debug!("health monitor stopped");
}

/// 连续结果计数，决定何时发出状态翻转
#[derive(Debug)]
struct StatusTracker {
    status: Option<MonitorStatus>,
    successes: u32,
    failures: u32,
    threshold: u32,
}

impl StatusTracker {
    fn new(threshold: u32) -> Self {
        Self {
            status: None,
            successes: 0,
            failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// 记录一次检查结果，状态发生翻转时返回新状态
    fn record(&mut self, ok: bool) -> Option<MonitorStatus> {
        if ok {
            self.failures = 0;
            self.successes += 1;
        } else {
            self.successes = 0;
            self.failures += 1;
        }

        let next = match self.status {
            // 首次成功立即 Up，之前的失败不产生事件
            None if ok => MonitorStatus::Up,
            None => return None,
            Some(MonitorStatus::Up) if !ok && self.failures >= self.threshold => MonitorStatus::Down,
            Some(MonitorStatus::Down) if ok && self.successes >= self.threshold => MonitorStatus::Up,
            Some(_) => return None,
        };
        self.status = Some(next);
        Some(next)
    }
}
