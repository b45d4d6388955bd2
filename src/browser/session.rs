//! 浏览器会话
//!
//! 持有浏览器、登录页和 OME 工作窗口，`close` 只能调用一次。

use crate::browser::{connect_to_browser, launch_browser};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{CdpDriver, PageDriver};
use chromiumoxide::Browser;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BrowserSession {
    browser: Arc<Browser>,
    main: CdpDriver,
    workspace: Option<Box<dyn PageDriver>>,
    /// 由本程序启动的浏览器，关闭会话时一并退出
    owned: bool,
}

impl BrowserSession {
    /// 按配置启动浏览器，配置了调试端口时改为连接已有浏览器
    pub async fn open(config: &Config) -> AppResult<Self> {
        let (browser, page, owned) = match config.browser_debug_port {
            Some(port) => {
                let (browser, page) = connect_to_browser(port).await?;
                (browser, page, false)
            }
            None => {
                let (browser, page) = launch_browser(config).await?;
                (browser, page, true)
            }
        };
        let browser = Arc::new(browser);
        let main = CdpDriver::new(page, browser.clone());
        Ok(Self {
            browser,
            main,
            workspace: None,
            owned,
        })
    }

    /// 登录页
    pub fn main_page(&self) -> &dyn PageDriver {
        &self.main
    }

    /// 接管 OME 工作窗口，返回其驱动
    pub fn attach_workspace(&mut self, workspace: Box<dyn PageDriver>) -> &dyn PageDriver {
        &**self.workspace.insert(workspace)
    }

    /// 关闭所有页面，并退出由本程序启动的浏览器
    pub async fn close(self) {
        let BrowserSession {
            browser,
            main,
            workspace,
            owned,
        } = self;

        if let Some(workspace) = workspace {
            if let Err(e) = workspace.close().await {
                warn!("⚠️ 关闭工作窗口失败: {}", e);
            }
        }
        if let Err(e) = main.close().await {
            warn!("⚠️ 关闭页面失败: {}", e);
        }
        drop(main);

        if !owned {
            debug!("浏览器不是本程序启动的，保持运行");
            return;
        }

        match Arc::try_unwrap(browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!("⚠️ 关闭浏览器失败: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    warn!("⚠️ 等待浏览器退出失败: {}", e);
                }
                info!("🔒 浏览器已关闭");
            }
            Err(_) => warn!("⚠️ 浏览器仍被引用，跳过关闭"),
        }
    }
}
