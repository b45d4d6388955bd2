use anyhow::Result;
use pami_auto::{logger, App, Config};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const DEFAULT_SETTINGS: &str = "settings.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：命令行第一个参数为配置文件路径
    let settings = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));
    let config = Config::load(&settings)?;

    // 初始化日志
    logger::init_with_file(&config.logs_dir.join("automation.log"), config.verbose_logging);

    // Ctrl-C 请求停止，当前案例处理完后退出
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，当前案例完成后停止");
            stop.cancel();
        }
    });

    // 初始化并运行应用
    let app = App::initialize(config, cancel)?;
    if let Err(e) = app.run().await {
        error!("❌ 运行中止: {}", e);
        return Err(e.into());
    }

    Ok(())
}
