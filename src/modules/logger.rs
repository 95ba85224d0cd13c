// 日志初始化
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::time::UtcTime, prelude::*, EnvFilter};

use crate::error::AppResult;

const LOG_FILE_PREFIX: &str = "gemini-relay.log";

/// 初始化日志
///
/// Console output is always on. With `log_dir` set, a daily-rolling file is written
/// as well; keep the returned guard alive or buffered lines are lost on exit.
/// Calling this twice is harmless, the second subscriber is simply not installed.
pub fn init_logger(log_dir: Option<&Path>) -> AppResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_timer(UtcTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        tracing::debug!("日志已初始化，跳过: {}", e);
    }

    Ok(guard)
}
