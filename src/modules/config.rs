use std::path::PathBuf;

use crate::error::AppResult;
use crate::proxy::config::RelayConfig;

const DOTENV_FILE: &str = ".env";

/// What happened to `.env` while loading. Reported once logging is up.
#[derive(Debug)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    Missing,
    Failed(String),
}

impl DotenvStatus {
    pub fn log(&self) {
        match self {
            DotenvStatus::Loaded(path) => tracing::info!("已加载环境文件: {}", path.display()),
            DotenvStatus::Missing => {
                tracing::debug!("no {} file, using process environment only", DOTENV_FILE)
            }
            DotenvStatus::Failed(e) => tracing::warn!("Failed to read {}: {}", DOTENV_FILE, e),
        }
    }
}

fn apply_dotenv() -> DotenvStatus {
    match dotenv::from_filename(DOTENV_FILE) {
        Ok(path) => DotenvStatus::Loaded(path),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            DotenvStatus::Missing
        }
        Err(e) => DotenvStatus::Failed(e.to_string()),
    }
}

/// 加载反代配置
///
/// `.env` in the working directory is applied first; variables already present in
/// the process environment win over it. Nothing is logged here since the logger
/// depends on the result (`LOG_DIR`).
pub fn load_relay_config() -> AppResult<(RelayConfig, DotenvStatus)> {
    let status = apply_dotenv();
    let config = RelayConfig::from_lookup(|key| std::env::var(key).ok())?;
    Ok((config, status))
}
