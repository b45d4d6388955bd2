//! 日志初始化
//!
//! 控制台输出 + 追加写入日志文件，级别由 RUST_LOG 控制。

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "pami_auto=info";
const VERBOSE_FILTER: &str = "pami_auto=debug";

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 只输出到控制台
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(false))
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// 同时写入日志文件
///
/// 文件无法打开时退回到只输出控制台。
pub fn init_with_file(log_file: &Path, verbose: bool) {
    if let Some(parent) = log_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file);

    let file_layer = match file {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!("无法打开日志文件 {}: {}", log_file.display(), e);
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();
}
