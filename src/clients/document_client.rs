//! 文档下载客户端
//!
//! 按 URL 下载证明文件，本地文件名由案例编号决定

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// 文档下载
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// 下载 `url` 到 `dest`，返回实际保存的路径
    async fn fetch(&self, url: &str, dest: &Path) -> AppResult<PathBuf>;
}

/// 基于 reqwest 的下载客户端
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
}

impl HttpDocumentFetcher {
    /// 创建新的下载客户端
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Other(format!("无法创建 HTTP 客户端: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> AppResult<PathBuf> {
        debug!("下载文档: {} -> {}", url, dest.display());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch_failed(url, format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::fetch_failed(url, "响应内容为空"));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(dest, &bytes).await?;

        info!("✓ 文档已下载: {} ({} 字节)", dest.display(), bytes.len());
        Ok(dest.to_path_buf())
    }
}

/// 案例文档的本地路径: `<downloads_dir>/<ndo>.<扩展名>`
///
/// 扩展名取自 URL 路径的最后一段（不含主机名），取不到时使用 pdf。
pub fn document_path(downloads_dir: &Path, ndo: &str, url: &str) -> PathBuf {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let path = without_scheme.split_once('/').map(|(_, path)| path).unwrap_or("");
    let extension = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "pdf".to_string());

    let safe_ndo: String = ndo
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    downloads_dir.join(format!("{}.{}", safe_ndo, extension))
}
