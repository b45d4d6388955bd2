//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use crate::config::Config;
use crate::models::{CaseOutcome, RunReport};
use crate::workflow::CaseCtx;
use std::path::Path;
use tracing::{info, warn};

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - PAMI 案例处理");
    info!("📁 数据文件: {}", config.input_file.display());
    match config.browser_debug_port {
        Some(port) => info!("🌐 连接已有浏览器 (端口: {})", port),
        None => info!("🌐 启动浏览器 (无头模式: {})", config.headless),
    }
    if !config.search_from_date.is_empty() {
        info!("📅 搜索起始日期: {}", config.search_from_date);
    }
    info!("{}", "=".repeat(60));
}

/// 记录案例加载信息
pub fn log_cases_loaded(pending: usize, already_processed: usize) {
    info!("✓ 找到 {} 个待处理的案例", pending);
    info!("📋 运行前已处理: {} 个", already_processed);
}

/// 记录案例开始信息
pub fn log_case_start(ctx: &CaseCtx) {
    info!("\n{}", "─".repeat(60));
    info!("{} 🔍 开始处理 (数据表第 {} 行)", ctx, ctx.sheet_row());
}

/// 记录案例结果
pub fn log_case_outcome(ctx: &CaseCtx, outcome: &CaseOutcome) {
    if outcome.is_processed() {
        info!("{} ✅ 已处理: {}", ctx, outcome.status);
    } else {
        match outcome.error() {
            Some(error) => warn!(
                "{} ❌ 失败: {} ({})",
                ctx,
                outcome.status,
                truncate_text(error, 120)
            ),
            None => warn!("{} ❌ 失败: {}", ctx, outcome.status),
        }
    }
}

/// 打印最终统计信息
pub fn print_final_stats(report: &RunReport, report_path: Option<&Path>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}", report.processed.len());
    info!("❌ 失败: {}", report.failed.len());
    info!("⏭️ 运行前已处理: {}", report.already_processed.len());
    if report.stopped {
        warn!("🛑 运行被停止请求中断");
    }
    info!("{}", "=".repeat(60));
    if let Some(path) = report_path {
        info!("\n报告已保存至: {}", path.display());
    }
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
