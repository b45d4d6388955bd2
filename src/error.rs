use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 元素在限定时间内没有出现
    #[error("等待元素超时: {selector} ({timeout_ms}ms)")]
    TransientUiTimeout { selector: String, timeout_ms: u64 },
    /// 页面上找不到元素
    #[error("元素不存在: {selector}")]
    ElementNotFound { selector: String },
    /// 页面状态无法判断
    #[error("页面状态不明确: {0}")]
    AmbiguousState(String),
    /// 操作前置条件不满足
    #[error("前置条件不满足: {0}")]
    PreconditionNotMet(String),
    /// 数据源写回失败
    #[error("数据写回失败: {0}")]
    ExternalWriteFailure(String),
    /// 登录失败，整个运行中止
    #[error("登录失败: {0}")]
    FatalAuthFailure(String),
    /// 数据源错误
    #[error("数据源错误: {0}")]
    Dataset(#[from] DatasetError),
    /// 文档下载错误
    #[error("文档下载失败 ({url}): {reason}")]
    Fetch { url: String, reason: String },
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {reason}")]
    ConnectionFailed { port: u16, reason: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {reason}")]
    NavigationFailed { url: String, reason: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptExecutionFailed(String),
    /// CDP 协议错误
    #[error("CDP 错误: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    /// 等待弹出窗口失败
    #[error("没有检测到弹出窗口 (触发元素: {trigger})")]
    PopupNotOpened { trigger: String },
    /// 等待原生对话框失败
    #[error("没有检测到对话框 (触发元素: {trigger})")]
    DialogNotOpened { trigger: String },
}

/// 数据源错误
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 文件不存在
    #[error("数据文件不存在: {}", .path.display())]
    NotFound { path: PathBuf },
    /// 读取工作簿失败
    #[error("读取工作簿失败: {0}")]
    ReadFailed(String),
    /// 写入工作簿失败
    #[error("写入工作簿失败: {0}")]
    WriteFailed(String),
    /// 缺少必须的列
    #[error("缺少必须的列: {column}")]
    MissingColumn { column: String },
    /// 工作表不存在
    #[error("工作表不存在: {0}")]
    SheetNotFound(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必填项为空
    #[error("配置项 {0} 不能为空")]
    MissingValue(String),
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({}): {reason}", .path.display())]
    ParseFailed { path: PathBuf, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Cdp(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed(err.to_string()))
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::Dataset(DatasetError::ReadFailed(err.to_string()))
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Dataset(DatasetError::WriteFailed(err.to_string()))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Dataset(DatasetError::WriteFailed(err.to_string()))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Fetch {
            url,
            reason: err.to_string(),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建等待超时错误
    pub fn timeout(selector: impl Into<String>, timeout_ms: u64) -> Self {
        AppError::TransientUiTimeout {
            selector: selector.into(),
            timeout_ms,
        }
    }

    /// 创建元素不存在错误
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        AppError::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(reason: impl std::fmt::Display) -> Self {
        AppError::Browser(BrowserError::LaunchFailed(reason.to_string()))
    }

    /// 创建浏览器连接错误
    pub fn browser_connection_failed(port: u16, reason: impl std::fmt::Display) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            reason: reason.to_string(),
        })
    }

    /// 创建文档下载错误
    pub fn fetch_failed(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// 是否为等待超时（元素没有出现）
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::TransientUiTimeout { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
