//! 门户登录
//!
//! 登录 PAMI 门户，打开 OME 工作窗口并进入 "Panel de prestaciones"。
//! 任何一步失败都返回 `AppError::FatalAuthFailure`，整个运行随之中止。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{Pacing, PageDriver, Pause, WaitState};
use std::sync::Arc;
use tracing::{debug, info};

/// 在文字中查找第一个出现的错误提示（不区分大小写）
pub fn matching_indicator(text: &str, indicators: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    indicators
        .iter()
        .find(|i| !i.is_empty() && lower.contains(&i.to_lowercase()))
        .cloned()
}

pub struct PortalLogin {
    config: Arc<Config>,
    pacing: Arc<dyn Pacing>,
}

impl PortalLogin {
    pub fn new(config: Arc<Config>, pacing: Arc<dyn Pacing>) -> Self {
        Self { config, pacing }
    }

    /// 填写凭据并提交，确认登录后的 OME 按钮出现
    pub async fn login(&self, driver: &dyn PageDriver) -> AppResult<()> {
        let selectors = &self.config.selectors;
        let timeout = self.config.browser_timeout();
        info!("🔐 登录门户: {}", self.config.login_url);

        driver.navigate(&self.config.login_url).await.map_err(auth_failure)?;
        driver
            .wait_for(&selectors.login_user, WaitState::Visible, timeout)
            .await
            .map_err(auth_failure)?;
        driver
            .fill(&selectors.login_user, &self.config.username)
            .await
            .map_err(auth_failure)?;
        driver
            .fill(&selectors.login_password, &self.config.password)
            .await
            .map_err(auth_failure)?;
        self.pacing.pause(Pause::Action).await;
        driver.click(&selectors.login_submit).await.map_err(auth_failure)?;

        match driver
            .wait_for(&selectors.ome_button, WaitState::Visible, timeout)
            .await
        {
            Ok(()) => {}
            Err(e) => {
                let reason = self
                    .detect_login_error(driver)
                    .await
                    .map(|indicator| format!("门户提示: {}", indicator))
                    .unwrap_or_else(|| format!("登录后没有出现 OME 按钮 ({})", e));
                return Err(AppError::FatalAuthFailure(reason));
            }
        }

        if let Some(indicator) = self.detect_login_error(driver).await {
            return Err(AppError::FatalAuthFailure(format!("门户提示: {}", indicator)));
        }

        info!("✅ 登录成功");
        Ok(())
    }

    /// 打开 OME 窗口并进入 "Panel de prestaciones"，返回工作窗口
    pub async fn open_workspace(&self, driver: &dyn PageDriver) -> AppResult<Box<dyn PageDriver>> {
        let selectors = &self.config.selectors;
        let timeout = self.config.browser_timeout();

        let workspace = driver
            .expect_popup(&selectors.ome_button, timeout)
            .await
            .map_err(auth_failure)?;
        debug!("OME 窗口已打开");

        workspace
            .wait_for(&selectors.panel_prestaciones, WaitState::Visible, timeout)
            .await
            .map_err(auth_failure)?;
        self.pacing.pause(Pause::Action).await;
        workspace
            .click(&selectors.panel_prestaciones)
            .await
            .map_err(auth_failure)?;
        workspace
            .wait_for(&selectors.search_ndo, WaitState::Visible, timeout)
            .await
            .map_err(auth_failure)?;

        info!("✅ 已进入 Panel de prestaciones");
        Ok(workspace)
    }

    /// 只检查错误提示容器，避免页面其它文字误判
    async fn detect_login_error(&self, driver: &dyn PageDriver) -> Option<String> {
        let text = driver.get_text(&self.config.selectors.login_error).await.ok()?;
        matching_indicator(&text, &self.config.labels.login_error_indicators)
    }
}

fn auth_failure(error: AppError) -> AppError {
    match error {
        AppError::FatalAuthFailure(_) => error,
        other => AppError::FatalAuthFailure(other.to_string()),
    }
}
