//! 案例处理流程 - 流程层
//!
//! 核心职责：定义"一个案例"的完整处理流程
//!
//! 流程顺序：
//! 1. 搜索 → 匹配编码
//! 2. 识别验证按钮
//! 3. 识别上传按钮 → 下载并上传文档（需要时）
//! 4. 传送

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::{document_path, DocumentFetcher};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{Pacing, PageDriver, Screenshotter};
use crate::models::{reason, ButtonState, Case, CaseOutcome, ResultRow, UploadState};
use crate::services::{case_matcher, SearchService, StatusClassifier, TransmitService, UploadService};
use crate::workflow::case_ctx::CaseCtx;

/// 案例处理流程
///
/// - 决定何时搜索、何时上传、何时传送
/// - 不持有任何页面资源，只依赖业务能力（services）
/// - 每个案例只产生一个结果
pub struct CaseFlow {
    config: Arc<Config>,
    search: SearchService,
    classifier: StatusClassifier,
    upload: UploadService,
    transmit: TransmitService,
    fetcher: Arc<dyn DocumentFetcher>,
    screenshots: Screenshotter,
}

impl CaseFlow {
    /// 创建新的案例处理流程
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn DocumentFetcher>,
        pacing: Arc<dyn Pacing>,
    ) -> Self {
        let screenshots = Screenshotter::new(config.screenshot_dir.clone());
        Self {
            search: SearchService::new(config.clone(), pacing.clone()),
            classifier: StatusClassifier::new(config.clone(), screenshots.clone()),
            upload: UploadService::new(config.clone(), pacing, screenshots.clone()),
            transmit: TransmitService::new(config.clone(), screenshots.clone()),
            fetcher,
            screenshots,
            config,
        }
    }

    /// 处理单个案例
    ///
    /// 返回 Err 只表示流程之外的意外错误，由调用方转换为 "processing error"。
    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        case: &Case,
        ctx: &CaseCtx,
    ) -> AppResult<CaseOutcome> {
        // ========== 搜索 ==========
        let rows = self.search.search(driver, case).await?;
        if rows.is_empty() {
            warn!("{} 搜索结果为空", ctx);
            return Ok(CaseOutcome::failed(case, reason::NO_TABLE_DATA));
        }

        // ========== 匹配 ==========
        let Some(row) = case_matcher::find_match(case, &rows) else {
            warn!("{} 在 {} 行结果中没有找到编码", ctx, rows.len());
            return Ok(CaseOutcome::failed(case, reason::CODE_NOT_FOUND)
                .with_error(format!("expected {}", case.codigo_pami)));
        };
        info!("{} 匹配到: {}", ctx, row.code_text);

        // ========== 验证按钮 ==========
        let validation = self.classifier.classify_validation(driver, row, case).await;
        info!("{} 验证状态: {}", ctx, validation.state);
        match validation.state {
            ButtonState::Processed => {
                Ok(CaseOutcome::failed(case, reason::MANUAL_VALIDATION_PENDING))
            }
            ButtonState::AlreadyCompleted => Ok(CaseOutcome::processed(
                case,
                reason::ALREADY_COMPLETED,
                Some(rows.len()),
            )),
            ButtonState::Error | ButtonState::Unknown => {
                let screenshot = self
                    .ensure_screenshot(driver, validation.screenshot, "validation_state", case)
                    .await;
                Ok(CaseOutcome::failed(case, reason::VALIDATION_INDICATOR_ERROR)
                    .with_screenshot(screenshot))
            }
            ButtonState::NeedsUpload => self.complete(driver, case, row, rows.len(), ctx).await,
        }
    }

    /// 上传（需要时）并传送
    async fn complete(
        &self,
        driver: &dyn PageDriver,
        case: &Case,
        row: &ResultRow,
        matched_rows: usize,
        ctx: &CaseCtx,
    ) -> AppResult<CaseOutcome> {
        // ========== 上传按钮 ==========
        let upload = self.classifier.classify_upload(driver, row, case).await;
        info!("{} 上传状态: {}", ctx, upload.state);
        match upload.state {
            UploadState::NeedsFileUpload => {
                let Some(url) = case.document_url() else {
                    warn!("{} 没有文档地址，无法上传", ctx);
                    return Ok(CaseOutcome::failed(case, reason::MISSING_DOCUMENT_URL));
                };

                let dest = document_path(&self.config.downloads_dir, &case.ndo, url);
                let document = match self.fetcher.fetch(url, &dest).await {
                    Ok(path) => path,
                    Err(e) => {
                        error!("{} 下载文档失败: {}", ctx, e);
                        return Ok(CaseOutcome::failed(case, reason::DOCUMENT_DOWNLOAD_FAILED)
                            .with_error(e.to_string()));
                    }
                };

                let result = self.upload.upload_document(driver, row, case, &document).await;
                if !result.success {
                    return Ok(CaseOutcome::failed(case, reason::UPLOAD_FAILED)
                        .with_screenshot(result.screenshot));
                }
            }
            UploadState::FileAlreadyUploaded => {
                info!("{} 文档已上传，直接传送", ctx);
            }
            UploadState::Unknown | UploadState::Error => {
                let screenshot = self
                    .ensure_screenshot(driver, upload.screenshot, "upload_state", case)
                    .await;
                return Ok(CaseOutcome::failed(case, reason::UPLOAD_INDICATOR_AMBIGUOUS)
                    .with_screenshot(screenshot));
            }
        }

        // ========== 传送 ==========
        let result = self.transmit.transmit(driver, row, case).await;
        if result.success {
            Ok(CaseOutcome::processed(case, reason::TRANSMITTED, Some(matched_rows)))
        } else {
            Ok(CaseOutcome::failed(case, reason::TRANSMIT_FAILED).with_screenshot(result.screenshot))
        }
    }

    /// 识别阶段没有截图时补一张
    async fn ensure_screenshot(
        &self,
        driver: &dyn PageDriver,
        existing: Option<PathBuf>,
        label: &str,
        case: &Case,
    ) -> Option<PathBuf> {
        match existing {
            Some(path) => Some(path),
            None => self.screenshots.capture(driver, label, &case.ndo).await,
        }
    }
}
