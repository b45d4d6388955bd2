//! 运行处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次运行的资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建数据源、文档下载器、报告写入器
//! 2. **加载案例**：读取未处理和已处理的案例，没有待处理案例时不启动浏览器
//! 3. **会话管理**：启动浏览器、登录、打开工作窗口，任何情况下都只关闭一次
//! 4. **向下委托**：委托 case_processor 处理案例
//! 5. **全局统计**：写出运行报告并输出统计

use crate::browser::BrowserSession;
use crate::clients::{DocumentFetcher, HttpDocumentFetcher};
use crate::config::Config;
use crate::dataset::{DatasetGateway, XlsxDataset};
use crate::error::AppResult;
use crate::infrastructure::{Pacing, RandomPacing};
use crate::models::{Case, RunReport};
use crate::orchestrator::case_processor::CaseProcessor;
use crate::services::{PortalLogin, ReportWriter};
use crate::utils::{log_cases_loaded, log_startup, print_final_stats};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    dataset: Arc<dyn DatasetGateway>,
    fetcher: Arc<dyn DocumentFetcher>,
    pacing: Arc<dyn Pacing>,
    report_writer: ReportWriter,
    cancel: CancellationToken,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, cancel: CancellationToken) -> AppResult<Self> {
        log_startup(&config);

        for dir in [&config.screenshot_dir, &config.downloads_dir, &config.logs_dir] {
            std::fs::create_dir_all(dir)?;
        }

        let dataset = XlsxDataset::new(
            config.input_file.clone(),
            config.sheet_name.clone(),
            config.columns.clone(),
        );
        let fetcher = HttpDocumentFetcher::new(config.browser_timeout())?;
        let pacing = RandomPacing::new(config.pacing.clone(), cancel.clone());
        let report_writer = ReportWriter::new(config.logs_dir.clone());

        Ok(Self {
            config: Arc::new(config),
            dataset: Arc::new(dataset),
            fetcher: Arc::new(fetcher),
            pacing: Arc::new(pacing),
            report_writer,
            cancel,
        })
    }

    /// 使用自定义的数据源和下载器（测试用）
    pub fn with_parts(
        config: Config,
        dataset: Arc<dyn DatasetGateway>,
        fetcher: Arc<dyn DocumentFetcher>,
        pacing: Arc<dyn Pacing>,
        cancel: CancellationToken,
    ) -> Self {
        let report_writer = ReportWriter::new(config.logs_dir.clone());
        Self {
            config: Arc::new(config),
            dataset,
            fetcher,
            pacing,
            report_writer,
            cancel,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<RunReport> {
        let cases = self.dataset.load_unprocessed().await?;
        let already_processed = self.dataset.already_processed().await?;
        log_cases_loaded(cases.len(), already_processed.len());

        if cases.is_empty() {
            warn!("⚠️ 没有待处理的案例，程序结束");
            let report = RunReport {
                already_processed,
                ..Default::default()
            };
            self.finish(&report);
            return Ok(report);
        }

        self.config.validate()?;

        let mut session = BrowserSession::open(&self.config).await?;
        let result = self.process_with_session(&mut session, &cases).await;
        session.close().await;

        let mut report = result?;
        report.already_processed = already_processed;
        self.finish(&report);
        Ok(report)
    }

    /// 登录并处理所有案例
    async fn process_with_session(
        &self,
        session: &mut BrowserSession,
        cases: &[Case],
    ) -> AppResult<RunReport> {
        let login = PortalLogin::new(self.config.clone(), self.pacing.clone());
        login.login(session.main_page()).await?;
        let workspace = login.open_workspace(session.main_page()).await?;
        let workspace = session.attach_workspace(workspace);

        let processor = CaseProcessor::new(
            self.config.clone(),
            self.dataset.clone(),
            self.fetcher.clone(),
            self.pacing.clone(),
            self.cancel.clone(),
        );
        Ok(processor.process_cases(workspace, cases).await)
    }

    /// 写出报告并输出统计
    fn finish(&self, report: &RunReport) {
        let report_path = match self.report_writer.write(report) {
            Ok(path) => {
                info!("📄 运行报告: {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("❌ 写入运行报告失败: {}", e);
                None
            }
        };
        print_final_stats(report, report_path.as_deref());
    }
}
