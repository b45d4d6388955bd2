//! 状态识别 - 业务能力层
//!
//! 读取结果行上的验证按钮与上传按钮，映射为 `ButtonState` / `UploadState`。
//! 每次调用都重新读取页面，不缓存之前的结果。

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{PageDriver, Screenshotter, WaitState};
use crate::models::{ButtonState, Case, ResultRow, UploadState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// 识别结果，出错时附带截图
#[derive(Debug, Clone, PartialEq)]
pub struct Classification<S> {
    pub state: S,
    pub screenshot: Option<PathBuf>,
}

impl<S> Classification<S> {
    fn of(state: S) -> Self {
        Self {
            state,
            screenshot: None,
        }
    }
}

/// 读取元素的 class 属性，元素在限定时间内没有出现时返回 None
pub async fn probe_class(
    driver: &dyn PageDriver,
    selector: &str,
    timeout: Duration,
) -> AppResult<Option<String>> {
    match driver.wait_for(selector, WaitState::Attached, timeout).await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => return Ok(None),
        Err(e) => return Err(e),
    }
    let class = driver.get_attribute(selector, "class").await?;
    Ok(Some(class.unwrap_or_default()))
}

/// 状态识别服务
pub struct StatusClassifier {
    config: Arc<Config>,
    screenshots: Screenshotter,
}

impl StatusClassifier {
    pub fn new(config: Arc<Config>, screenshots: Screenshotter) -> Self {
        Self {
            config,
            screenshots,
        }
    }

    /// 识别验证按钮
    ///
    /// 按钮不存在表示门户已完全受理该案例。
    pub async fn classify_validation(
        &self,
        driver: &dyn PageDriver,
        row: &ResultRow,
        case: &Case,
    ) -> Classification<ButtonState> {
        let selector = row.scope(&self.config.selectors.validation_button);
        match probe_class(driver, &selector, self.config.indicator_timeout()).await {
            Ok(None) => {
                debug!("NDO {} 没有验证按钮，视为已完成", case.ndo);
                Classification::of(ButtonState::AlreadyCompleted)
            }
            Ok(Some(class)) => {
                let state = ButtonState::from_class_attr(&class);
                debug!("NDO {} 验证按钮 class=\"{}\" → {}", case.ndo, class, state);
                Classification::of(state)
            }
            Err(e) => {
                error!("NDO {} 读取验证按钮失败: {}", case.ndo, e);
                let screenshot = self
                    .screenshots
                    .capture(driver, "validation_error", &case.ndo)
                    .await;
                Classification {
                    state: ButtonState::Error,
                    screenshot,
                }
            }
        }
    }

    /// 识别上传按钮
    ///
    /// 与验证按钮不同，按钮不存在或无法识别都返回 `Unknown`。
    pub async fn classify_upload(
        &self,
        driver: &dyn PageDriver,
        row: &ResultRow,
        case: &Case,
    ) -> Classification<UploadState> {
        let selector = row.scope(&self.config.selectors.upload_button);
        match probe_class(driver, &selector, self.config.indicator_timeout()).await {
            Ok(None) => {
                debug!("NDO {} 没有上传按钮", case.ndo);
                Classification::of(UploadState::Unknown)
            }
            Ok(Some(class)) => {
                let state = UploadState::from_class_attr(&class);
                debug!("NDO {} 上传按钮 class=\"{}\" → {}", case.ndo, class, state);
                Classification::of(state)
            }
            Err(e) => {
                error!("NDO {} 读取上传按钮失败: {}", case.ndo, e);
                let screenshot = self
                    .screenshots
                    .capture(driver, "upload_state_error", &case.ndo)
                    .await;
                Classification {
                    state: UploadState::Error,
                    screenshot,
                }
            }
        }
    }
}
