//! 页面驱动接口 - 基础设施层
//!
//! 流程层只通过这个 trait 操作页面，不直接接触 chromiumoxide。
//! 所有调用都有超时上限，超时返回 `AppError::TransientUiTimeout`。

use crate::error::AppResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 等待元素达到的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// 存在于 DOM 中
    Attached,
    /// 存在且可见
    Visible,
    /// 不存在或不可见
    Hidden,
}

/// `query_all` 返回的节点快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NodeSnapshot {
    /// 驱动分配的句柄，页面上对应 `data-rpa-key` 属性
    pub key: String,
    /// innerText
    #[serde(default)]
    pub text: String,
    /// value 属性（option / input）
    #[serde(default)]
    pub value: Option<String>,
    /// 子单元格文字（td / th）
    #[serde(default)]
    pub cells: Vec<String>,
}

impl NodeSnapshot {
    /// 该节点的选择器
    pub fn selector(&self) -> String {
        format!("[data-rpa-key=\"{}\"]", self.key)
    }
}

/// 页面驱动
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到指定 URL
    async fn navigate(&self, url: &str) -> AppResult<()>;

    /// 清空并填写输入框
    async fn fill(&self, selector: &str, text: &str) -> AppResult<()>;

    /// 点击元素
    async fn click(&self, selector: &str) -> AppResult<()>;

    /// 选择下拉框的选项
    async fn select_option(&self, selector: &str, value: &str) -> AppResult<()>;

    /// 等待元素达到指定状态
    async fn wait_for(&self, selector: &str, state: WaitState, timeout: Duration)
        -> AppResult<()>;

    /// 读取属性，元素存在但没有该属性时返回 None
    async fn get_attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>>;

    /// 读取元素文字
    async fn get_text(&self, selector: &str) -> AppResult<String>;

    /// 查询所有匹配的元素
    async fn query_all(&self, selector: &str) -> AppResult<Vec<NodeSnapshot>>;

    /// 点击触发元素并等待新窗口打开，返回新窗口的驱动
    async fn expect_popup(&self, trigger: &str, timeout: Duration)
        -> AppResult<Box<dyn PageDriver>>;

    /// 通过文件选择控件提交本地文件
    async fn choose_file(&self, selector: &str, path: &Path) -> AppResult<()>;

    /// 点击触发元素并接受弹出的原生对话框，返回对话框内容
    async fn expect_dialog(&self, trigger: &str, timeout: Duration) -> AppResult<String>;

    /// 向页面发送按键（例如 "Escape"）
    async fn press_key(&self, key: &str) -> AppResult<()>;

    /// 截图保存到指定路径
    async fn screenshot(&self, path: &Path) -> AppResult<()>;

    /// 关闭页面
    async fn close(&self) -> AppResult<()>;
}
