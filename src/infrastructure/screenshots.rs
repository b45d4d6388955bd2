//! 失败截图

use crate::infrastructure::page_driver::PageDriver;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("静态正则"))
}

/// 截图保存器
#[derive(Debug, Clone)]
pub struct Screenshotter {
    dir: PathBuf,
}

impl Screenshotter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 生成截图路径: `<dir>/<label>_<ndo>_<时间戳>.png`
    pub fn path_for(&self, label: &str, ndo: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let file_name = format!(
            "{}_{}_{}.png",
            unsafe_chars().replace_all(label, "_"),
            unsafe_chars().replace_all(ndo, "_"),
            timestamp
        );
        self.dir.join(file_name)
    }

    /// 截图，失败时只记录日志
    pub async fn capture(&self, driver: &dyn PageDriver, label: &str, ndo: &str) -> Option<PathBuf> {
        let path = self.path_for(label, ndo);
        match driver.screenshot(&path).await {
            Ok(()) => {
                info!("📸 已保存截图: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("⚠️ 截图失败 ({}): {}", label, e);
                None
            }
        }
    }
}
