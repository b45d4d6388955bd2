//! 案例处理器 - 编排层
//!
//! ## 职责
//!
//! 按顺序处理本次运行的所有案例，是案例级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **遍历案例**：一次只处理一个案例，门户会话不能并行使用
//! 2. **流程调度**：创建并复用 `CaseFlow`
//! 3. **兜底**：流程中的意外错误转换为 "processing error"，继续下一个案例
//! 4. **写回**：每个案例结束后立即写回数据源，且只写一次
//! 5. **停止**：每个案例开始前、案例之间的等待中检查停止请求

use crate::clients::DocumentFetcher;
use crate::config::Config;
use crate::dataset::{DatasetGateway, MarkResult};
use crate::error::AppError;
use crate::infrastructure::{Pacing, PageDriver, Pause, Screenshotter};
use crate::models::{reason, Case, CaseOutcome, RunReport};
use crate::workflow::{CaseCtx, CaseFlow};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// 案例处理器
pub struct CaseProcessor {
    flow: CaseFlow,
    dataset: Arc<dyn DatasetGateway>,
    pacing: Arc<dyn Pacing>,
    screenshots: Screenshotter,
    cancel: CancellationToken,
}

impl CaseProcessor {
    pub fn new(
        config: Arc<Config>,
        dataset: Arc<dyn DatasetGateway>,
        fetcher: Arc<dyn DocumentFetcher>,
        pacing: Arc<dyn Pacing>,
        cancel: CancellationToken,
    ) -> Self {
        let screenshots = Screenshotter::new(config.screenshot_dir.clone());
        Self {
            flow: CaseFlow::new(config, fetcher, pacing.clone()),
            dataset,
            pacing,
            screenshots,
            cancel,
        }
    }

    /// 处理所有案例，返回本次运行的结果
    ///
    /// `already_processed` 由调用方填写。
    pub async fn process_cases(&self, driver: &dyn PageDriver, cases: &[Case]) -> RunReport {
        let mut report = RunReport::default();
        let total = cases.len();

        for (index, case) in cases.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("🛑 收到停止请求，剩余 {} 个案例未处理", total - index);
                report.stopped = true;
                break;
            }

            let ctx = CaseCtx::new(index + 1, total, case);
            crate::utils::log_case_start(&ctx);

            let outcome = self.process_case(driver, case, &ctx).await;
            self.write_back(&outcome, &ctx).await;
            crate::utils::log_case_outcome(&ctx, &outcome);
            report.record(outcome);

            if index + 1 < total && !self.pacing.pause(Pause::BetweenCases).await {
                warn!("🛑 收到停止请求，剩余 {} 个案例未处理", total - index - 1);
                report.stopped = true;
                break;
            }
        }

        report
    }

    /// 执行流程，意外错误转换为失败结果
    async fn process_case(&self, driver: &dyn PageDriver, case: &Case, ctx: &CaseCtx) -> CaseOutcome {
        match self.flow.run(driver, case, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} ❌ 处理出错: {}", ctx, e);
                let screenshot = self
                    .screenshots
                    .capture(driver, "processing_error", &case.ndo)
                    .await;
                CaseOutcome::failed(case, reason::PROCESSING_ERROR)
                    .with_error(e.to_string())
                    .with_screenshot(screenshot)
            }
        }
    }

    /// 按自然键写回，失败只记录日志
    async fn write_back(&self, outcome: &CaseOutcome, ctx: &CaseCtx) {
        let key = outcome.case.key();
        let result = if outcome.is_processed() {
            self.dataset.mark_processed(&key).await
        } else {
            self.dataset.mark_failed(&key).await
        };

        match result {
            Ok(MarkResult::Marked) => {}
            Ok(MarkResult::AlreadyMarked) => warn!("{} ⚠️ 数据源中已带有相同标记", ctx),
            Err(e @ AppError::ExternalWriteFailure(_)) => {
                error!("{} ❌ 数据源中找不到记录 {}: {}", ctx, key, e)
            }
            Err(e) => error!("{} ❌ 写回数据源失败: {}", ctx, e),
        }
    }
}
