//! 搜索服务
//!
//! 填写搜索表单并读取结果表格

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{Pacing, PageDriver, Pause, WaitState};
use crate::models::{Case, ResultRow};
use crate::services::case_matcher;
use std::sync::Arc;
use tracing::debug;

/// 搜索服务
pub struct SearchService {
    config: Arc<Config>,
    pacing: Arc<dyn Pacing>,
}

impl SearchService {
    /// 创建新的搜索服务
    pub fn new(config: Arc<Config>, pacing: Arc<dyn Pacing>) -> Self {
        Self { config, pacing }
    }

    /// 按案例编号搜索，返回结果表格中的行
    ///
    /// 表格在限定时间内没有出现时返回空列表。
    pub async fn search(&self, driver: &dyn PageDriver, case: &Case) -> AppResult<Vec<ResultRow>> {
        let selectors = &self.config.selectors;

        driver
            .wait_for(&selectors.search_ndo, WaitState::Visible, self.config.modal_timeout())
            .await?;

        if !self.config.search_from_date.is_empty() {
            driver
                .fill(&selectors.search_date_from, &self.config.search_from_date)
                .await?;
        }
        driver.fill(&selectors.search_ndo, &case.ndo).await?;
        self.pacing.pause(Pause::Action).await;
        driver.click(&selectors.search_button).await?;

        match driver
            .wait_for(&selectors.result_rows, WaitState::Attached, self.config.table_timeout())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                debug!("结果表格没有出现: {}", e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        }
        self.pacing.pause(Pause::Action).await;

        let nodes = driver.query_all(&selectors.result_rows).await?;
        let rows = case_matcher::extract_rows(nodes, selectors.code_column);
        debug!("搜索 NDO {} 得到 {} 行", case.ndo, rows.len());
        Ok(rows)
    }
}
