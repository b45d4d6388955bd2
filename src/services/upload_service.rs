//! 上传服务 - 业务能力层
//!
//! 在附件对话框中选择报告类型并上传文档，完成后关闭对话框。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{Pacing, PageDriver, Pause, Screenshotter, WaitState};
use crate::models::{Case, ResultRow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 关闭按钮的等待时间
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// 单个步骤的结果，失败时附带截图
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    pub success: bool,
    pub screenshot: Option<PathBuf>,
}

impl StepResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            screenshot: None,
        }
    }

    pub fn failed(screenshot: Option<PathBuf>) -> Self {
        Self {
            success: false,
            screenshot,
        }
    }
}

/// 文字是否包含标记（不区分大小写）
pub fn contains_marker(text: &str, marker: &str) -> bool {
    text.to_uppercase().contains(&marker.to_uppercase())
}

/// 上传服务
pub struct UploadService {
    config: Arc<Config>,
    pacing: Arc<dyn Pacing>,
    screenshots: Screenshotter,
}

impl UploadService {
    pub fn new(config: Arc<Config>, pacing: Arc<dyn Pacing>, screenshots: Screenshotter) -> Self {
        Self {
            config,
            pacing,
            screenshots,
        }
    }

    /// 上传文档
    ///
    /// 1. 点击行上的上传按钮打开附件对话框
    /// 2. 选择包含报告标记的文档类型
    /// 3. 通过文件控件提交文件
    /// 4. 确认附件列表中出现报告
    /// 5. 关闭对话框（无论成功与否）
    pub async fn upload_document(
        &self,
        driver: &dyn PageDriver,
        row: &ResultRow,
        case: &Case,
        document: &Path,
    ) -> StepResult {
        info!("📎 上传文档: NDO {} ← {}", case.ndo, document.display());

        let result = match self.run_upload(driver, row, document).await {
            Ok(()) => {
                info!("✅ 文档上传完成: NDO {}", case.ndo);
                StepResult::ok()
            }
            Err(e) => {
                error!("❌ 上传失败 NDO {}: {}", case.ndo, e);
                let screenshot = self
                    .screenshots
                    .capture(driver, "upload_error", &case.ndo)
                    .await;
                StepResult::failed(screenshot)
            }
        };

        self.close_modal(driver).await;
        result
    }

    async fn run_upload(
        &self,
        driver: &dyn PageDriver,
        row: &ResultRow,
        document: &Path,
    ) -> AppResult<()> {
        let selectors = &self.config.selectors;
        let marker = &self.config.labels.report_marker;
        let timeout = self.config.modal_timeout();

        driver.click(&row.scope(&selectors.upload_button)).await?;
        self.pacing.pause(Pause::Action).await;

        driver
            .wait_for(&selectors.document_type_select, WaitState::Visible, timeout)
            .await?;
        let options = driver
            .query_all(&format!("{} option", selectors.document_type_select))
            .await?;
        let option = options
            .iter()
            .find(|o| contains_marker(&o.text, marker))
            .ok_or_else(|| {
                AppError::AmbiguousState(format!("文档类型中没有包含 {} 的选项", marker))
            })?;
        let value = option.value.clone().unwrap_or_else(|| option.text.clone());
        debug!("选择文档类型: {} ({})", option.text, value);
        driver
            .select_option(&selectors.document_type_select, &value)
            .await?;
        self.pacing.pause(Pause::Action).await;

        driver
            .wait_for(&selectors.file_input, WaitState::Attached, timeout)
            .await?;
        driver.choose_file(&selectors.file_input, document).await?;
        self.pacing.pause(Pause::Action).await;

        driver
            .wait_for(&selectors.attachment_rows, WaitState::Attached, timeout)
            .await?;
        let attachments = driver.query_all(&selectors.attachment_rows).await?;
        if !attachments.iter().any(|a| contains_marker(&a.text, marker)) {
            return Err(AppError::AmbiguousState(format!(
                "附件列表中没有 {} ({} 行)",
                marker,
                attachments.len()
            )));
        }
        Ok(())
    }

    /// 关闭附件对话框，关闭按钮不可用时按 Escape
    async fn close_modal(&self, driver: &dyn PageDriver) {
        let close = &self.config.selectors.modal_close;
        let clicked = match driver.wait_for(close, WaitState::Visible, CLOSE_TIMEOUT).await {
            Ok(()) => driver.click(close).await.is_ok(),
            Err(_) => false,
        };
        if !clicked {
            if let Err(e) = driver.press_key("Escape").await {
                warn!("⚠️ 无法关闭附件对话框: {}", e);
            }
        }
        self.pacing.pause(Pause::Action).await;
    }
}
