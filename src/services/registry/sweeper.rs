use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::storage::ServiceStorage;

/// 清理间隔下限，`tokio::time::interval` 不接受零周期
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// 存活清理配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// 心跳超时时长，超过即视为失效
    pub ttl: Duration,
    /// 清理任务的唤醒间隔
    pub interval: Duration,
}

impl SweeperConfig {
    /// 清理间隔与 TTL 相同
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, interval: ttl }
    }

    /// 实际使用的清理间隔，不低于 `MIN_SWEEP_INTERVAL`
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_SWEEP_INTERVAL)
    }
}

/// 每个注册表实例唯一的后台清理任务
#[derive(Debug)]
pub struct LivenessSweeper {
    config: SweeperConfig,
    started: AtomicBool,
    shutdown: CancellationToken,
    task_tracker: TaskTracker,
}

impl LivenessSweeper {
    pub fn new(config: SweeperConfig) -> Self {
        Self {
            config,
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> SweeperConfig {
        self.config
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.shutdown.is_cancelled()
    }

    /// 确保清理任务已启动，重复调用无副作用；停止后不会再次启动
    ///
    /// 返回值表示本次调用是否真正启动了任务。
    pub fn ensure_started(&self, storage: Arc<dyn ServiceStorage>) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.started.store(false, Ordering::Release);
                tracing::warn!(error = %e, "No tokio runtime available, liveness sweeper not started");
                return false;
            }
        };

        let config = self.config;
        let shutdown = self.shutdown.clone();
        self.task_tracker
            .spawn_on(Self::run(storage, config, shutdown), &handle);

        tracing::info!(
            ttl_ms = config.ttl.as_millis() as u64,
            interval_ms = config.effective_interval().as_millis() as u64,
            "Liveness sweeper started"
        );
        true
    }

    /// 发出停止信号，可重复调用且不阻塞
    pub fn stop(&self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            tracing::debug!("Liveness sweeper stop requested");
        }
        self.task_tracker.close();
    }

    /// 停止并等待后台任务退出
    pub async fn shutdown(&self) {
        self.stop();
        self.task_tracker.wait().await;
    }

    async fn run(storage: Arc<dyn ServiceStorage>, config: SweeperConfig, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(config.effective_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即返回，跳过
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    tracing::debug!("Executing service expiration check...");
                    Self::sweep(storage.as_ref(), config.ttl);
                }
            }
        }

        tracing::info!("Liveness sweeper stopped");
    }

    /// 执行一次完整的扫描清理，返回被移除的实例数
    pub fn sweep(storage: &dyn ServiceStorage, ttl: Duration) -> usize {
        let now = Utc::now();
        let evicted = storage.evict_expired(ttl, now);

        for entity in &evicted {
            tracing::warn!(
                service_name = %entity.name(),
                service_id = %entity.id(),
                address = %entity.address(),
                elapsed_secs = entity.age(now).as_secs(),
                timeout_secs = ttl.as_secs(),
                "Service expired due to heartbeat timeout, removed from registry"
            );
        }

        if !evicted.is_empty() {
            tracing::info!(
                expired_count = evicted.len(),
                remaining = storage.len(),
                "Cleanup check completed"
            );
        }
        evicted.len()
    }
}

impl Drop for LivenessSweeper {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
