//! chromiumoxide 页面驱动
//!
//! 用 JsExecutor 执行 DOM 脚本，实现 `PageDriver`。
//! 文件选择、原生对话框、截图直接走 CDP 命令。

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::js_executor::{self, JsExecutor};
use crate::infrastructure::page_driver::{NodeSnapshot, PageDriver, WaitState};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct Lookup {
    found: bool,
    value: Option<String>,
}

/// chromiumoxide 页面驱动
pub struct CdpDriver {
    executor: JsExecutor,
    browser: Arc<Browser>,
}

impl CdpDriver {
    pub fn new(page: Page, browser: Arc<Browser>) -> Self {
        Self {
            executor: JsExecutor::new(page),
            browser,
        }
    }

    fn page(&self) -> &Page {
        self.executor.page()
    }

    async fn element_state(&self, selector: &str) -> AppResult<String> {
        self.executor
            .eval_as(js_executor::element_state_script(selector))
            .await
    }

    async fn lookup(&self, script: String, selector: &str) -> AppResult<Option<String>> {
        let lookup: Lookup = self.executor.eval_as(script).await?;
        if !lookup.found {
            return Err(AppError::element_not_found(selector));
        }
        Ok(lookup.value)
    }

    async fn page_ids(&self) -> AppResult<HashSet<String>> {
        let pages = self.browser.pages().await?;
        Ok(pages
            .iter()
            .map(|p| p.target_id().inner().clone())
            .collect())
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.page().goto(url).await.map_err(|e| {
            AppError::Browser(BrowserError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
        })?;
        self.page().wait_for_navigation().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        let found: bool = self
            .executor
            .eval_as(js_executor::fill_script(selector, text))
            .await?;
        if !found {
            return Err(AppError::element_not_found(selector));
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        debug!("点击: {}", selector);
        let element = self
            .page()
            .find_element(selector)
            .await
            .map_err(|_| AppError::element_not_found(selector))?;
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> AppResult<()> {
        let found: bool = self
            .executor
            .eval_as(js_executor::select_option_script(selector, value))
            .await?;
        if !found {
            return Err(AppError::element_not_found(format!("{} option={}", selector, value)));
        }
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> AppResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let current = self.element_state(selector).await?;
            let reached = match state {
                WaitState::Attached => current != "missing",
                WaitState::Visible => current == "visible",
                WaitState::Hidden => current != "visible",
            };
            if reached {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::timeout(selector, timeout.as_millis() as u64));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn get_attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        self.lookup(js_executor::attribute_script(selector, name), selector)
            .await
    }

    async fn get_text(&self, selector: &str) -> AppResult<String> {
        let text = self
            .lookup(js_executor::text_script(selector), selector)
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> AppResult<Vec<NodeSnapshot>> {
        self.executor
            .eval_as(js_executor::query_all_script(selector))
            .await
    }

    async fn expect_popup(
        &self,
        trigger: &str,
        timeout: Duration,
    ) -> AppResult<Box<dyn PageDriver>> {
        let before = self.page_ids().await?;
        self.click(trigger).await?;

        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            sleep(POLL_INTERVAL).await;
            let pages = self.browser.pages().await?;
            if let Some(popup) = pages
                .into_iter()
                .find(|p| !before.contains(p.target_id().inner()))
            {
                debug!("检测到新窗口: {:?}", popup.target_id());
                return Ok(Box::new(CdpDriver::new(popup, self.browser.clone())));
            }
        }

        Err(AppError::Browser(BrowserError::PopupNotOpened {
            trigger: trigger.to_string(),
        }))
    }

    async fn choose_file(&self, selector: &str, path: &Path) -> AppResult<()> {
        let absolute = std::fs::canonicalize(path)?;
        let element = self
            .page()
            .find_element(selector)
            .await
            .map_err(|_| AppError::element_not_found(selector))?;

        let mut params =
            SetFileInputFilesParams::new(vec![absolute.to_string_lossy().to_string()]);
        params.backend_node_id = Some(element.backend_node_id);
        self.page().execute(params).await?;

        // 部分页面只监听 change 事件
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (el) el.dispatchEvent(new Event("change", {{ bubbles: true }}));
                return true;
            }})()"#,
            js_executor::js_str(selector)
        );
        self.executor.eval(script).await?;
        Ok(())
    }

    async fn expect_dialog(&self, trigger: &str, timeout: Duration) -> AppResult<String> {
        let mut dialogs = self
            .page()
            .event_listener::<EventJavascriptDialogOpening>()
            .await?;

        // 对话框打开时 CDP 的鼠标事件会阻塞，因此用脚本异步点击
        let clicked: bool = self
            .executor
            .eval_as(js_executor::deferred_click_script(trigger))
            .await?;
        if !clicked {
            return Err(AppError::element_not_found(trigger));
        }

        let event = tokio::time::timeout(timeout, dialogs.next())
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                AppError::Browser(BrowserError::DialogNotOpened {
                    trigger: trigger.to_string(),
                })
            })?;

        let message = event.message.clone();
        debug!("对话框内容: {}", message);
        self.page()
            .execute(HandleJavaScriptDialogParams::new(true))
            .await?;
        Ok(message)
    }

    async fn press_key(&self, key: &str) -> AppResult<()> {
        let body = self.page().find_element("body").await?;
        body.press_key(key).await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.page()
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        if let Err(e) = self.page().clone().close().await {
            warn!("关闭页面失败: {}", e);
        }
        Ok(())
    }
}
