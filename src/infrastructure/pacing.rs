//! 节奏控制
//!
//! 案例之间、界面操作前后的随机等待。等待可被停止请求打断。

use crate::config::PacingConfig;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 等待类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// 两个案例之间
    BetweenCases,
    /// 界面操作前后
    Action,
}

#[async_trait]
pub trait Pacing: Send + Sync {
    /// 等待一段时间，被停止请求打断时返回 false
    async fn pause(&self, kind: Pause) -> bool;
}

/// 按配置范围随机等待
pub struct RandomPacing {
    config: PacingConfig,
    cancel: CancellationToken,
}

impl RandomPacing {
    pub fn new(config: PacingConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    fn pick(&self, kind: Pause) -> Duration {
        let (min, max) = match kind {
            Pause::BetweenCases => (self.config.case_delay_min_ms, self.config.case_delay_max_ms),
            Pause::Action => (
                self.config.action_delay_min_ms,
                self.config.action_delay_max_ms,
            ),
        };
        let millis = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        Duration::from_millis(millis)
    }
}

#[async_trait]
impl Pacing for RandomPacing {
    async fn pause(&self, kind: Pause) -> bool {
        let delay = self.pick(kind);
        debug!("等待 {:?} ({:?})", delay, kind);
        cancellable_sleep(delay, &self.cancel).await
    }
}

/// 不等待，只检查停止请求（测试用）
pub struct NoPacing {
    cancel: CancellationToken,
}

impl NoPacing {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl Pacing for NoPacing {
    async fn pause(&self, _kind: Pause) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// 可被打断的 sleep，完整睡完返回 true
pub async fn cancellable_sleep(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_request_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let completed = cancellable_sleep(Duration::from_secs(30), &cancel).await;
        assert!(!completed);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn random_delay_stays_in_range() {
        let config = PacingConfig {
            case_delay_min_ms: 5,
            case_delay_max_ms: 10,
            action_delay_min_ms: 1,
            action_delay_max_ms: 1,
        };
        let pacing = RandomPacing::new(config, CancellationToken::new());
        for _ in 0..20 {
            let d = pacing.pick(Pause::BetweenCases);
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
        }
        assert_eq!(pacing.pick(Pause::Action), Duration::from_millis(1));
        assert!(pacing.pause(Pause::Action).await);
    }

    #[tokio::test]
    async fn no_pacing_reports_stop() {
        let cancel = CancellationToken::new();
        let pacing = NoPacing::new(cancel.clone());
        assert!(pacing.pause(Pause::BetweenCases).await);
        cancel.cancel();
        assert!(!pacing.pause(Pause::BetweenCases).await);
    }
}
