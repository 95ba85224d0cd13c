mod modules;
pub mod proxy;  // 反代服务模块
pub mod error;

use std::sync::Arc;
use tracing::{error, info};

use proxy::{AxumServer, ProxyMonitor};

/// Loads configuration, starts the relay and serves until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let (config, dotenv_status) = modules::config::load_relay_config()?;

    // 初始化日志 (依赖 LOG_DIR，所以在读取配置之后)
    let _log_guard = modules::logger::init_logger(config.log_dir.as_deref())?;
    dotenv_status.log();
    info!("Loaded relay configuration: {:?}", config);

    if !config.has_credential() {
        // 服务仍然启动，只有需要凭证的请求会失败
        error!("GEMINI_API_KEY is not set; relay requests will fail with 500 until it is configured");
    }

    let monitor = Arc::new(ProxyMonitor::new());
    let (server, handle) = AxumServer::start(config, monitor)
        .await
        .map_err(anyhow::Error::msg)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server.stop();
    if let Err(e) = handle.await {
        error!("Server task ended abnormally: {}", e);
    }
    Ok(())
}
