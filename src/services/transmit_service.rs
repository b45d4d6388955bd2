//! 传送服务 - 业务能力层
//!
//! 两个指示按钮都是蓝色时才传送；确认后接受门户弹出的原生对话框。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, Screenshotter, WaitState};
use crate::models::state::is_ready_marker;
use crate::models::{Case, ResultRow};
use crate::services::status_classifier::probe_class;
use crate::services::upload_service::StepResult;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct TransmitService {
    config: Arc<Config>,
    screenshots: Screenshotter,
}

impl TransmitService {
    pub fn new(config: Arc<Config>, screenshots: Screenshotter) -> Self {
        Self {
            config,
            screenshots,
        }
    }

    /// 传送案例
    ///
    /// 前置条件不满足时直接返回失败，不点击任何按钮，也不截图。
    pub async fn transmit(&self, driver: &dyn PageDriver, row: &ResultRow, case: &Case) -> StepResult {
        match self.indicators_ready(driver, row).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "⚠️ NDO {} {}",
                    case.ndo,
                    AppError::PreconditionNotMet("指示按钮不是蓝色，不传送".to_string())
                );
                return StepResult::failed(None);
            }
            Err(e) => {
                error!("❌ NDO {} 读取指示按钮失败: {}", case.ndo, e);
                let screenshot = self
                    .screenshots
                    .capture(driver, "transmit_check_error", &case.ndo)
                    .await;
                return StepResult::failed(screenshot);
            }
        }

        match self.run_transmit(driver, row).await {
            Ok(message) => {
                let phrase = &self.config.labels.transmit_success_phrase;
                if message.to_lowercase().contains(&phrase.to_lowercase()) {
                    info!("📤 NDO {} 传送成功: {}", case.ndo, message);
                } else {
                    warn!("⚠️ NDO {} 传送对话框内容异常: {}", case.ndo, message);
                }
                StepResult::ok()
            }
            Err(e) => {
                error!("❌ NDO {} 传送失败: {}", case.ndo, e);
                let screenshot = self
                    .screenshots
                    .capture(driver, "transmit_error", &case.ndo)
                    .await;
                StepResult::failed(screenshot)
            }
        }
    }

    /// 重新读取两个指示按钮，都带有蓝色标记才返回 true
    async fn indicators_ready(&self, driver: &dyn PageDriver, row: &ResultRow) -> AppResult<bool> {
        let selectors = &self.config.selectors;
        let timeout = self.config.indicator_timeout();

        let validation = probe_class(driver, &row.scope(&selectors.validation_button), timeout).await?;
        let upload = probe_class(driver, &row.scope(&selectors.upload_button), timeout).await?;

        let ready = |class: Option<String>| class.as_deref().is_some_and(is_ready_marker);
        Ok(ready(validation) && ready(upload))
    }

    async fn run_transmit(&self, driver: &dyn PageDriver, row: &ResultRow) -> AppResult<String> {
        let selectors = &self.config.selectors;
        let label = self.config.labels.confirm_label.trim();

        driver.click(&row.scope(&selectors.transmit_button)).await?;
        driver
            .wait_for(&selectors.confirm_container, WaitState::Visible, self.config.modal_timeout())
            .await?;

        let buttons = driver.query_all(&selectors.confirm_buttons).await?;
        let confirm = buttons
            .iter()
            .find(|b| b.text.trim().eq_ignore_ascii_case(label))
            .ok_or_else(|| {
                AppError::element_not_found(format!("{} \"{}\"", selectors.confirm_buttons, label))
            })?;

        driver
            .expect_dialog(&confirm.selector(), self.config.dialog_timeout())
            .await
    }
}
