//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和日志轮转

use std::path::{Path, PathBuf};

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_FILE: &str = "registrar.log";

/// 日志文件的目录与文件名前缀（按天轮转时追加日期后缀）
fn log_file_target(config: &LoggingConfig) -> (PathBuf, String) {
    let path = config.log_file_path.as_deref().map(Path::new);

    let dir = path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR));
    let file_name = path
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);

    (dir.to_path_buf(), file_name.to_string())
}

/// 初始化日志系统
///
/// 开启文件日志时返回 `WorkerGuard`，调用方需持有到进程退出，否则缓冲日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.enable_file_logging {
        let (log_dir, file_name) = log_file_target(config);
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = rolling::daily(&log_dir, &file_name);
        let (writer, guard) = non_blocking(file_appender);

        if config.format == "json" {
            Registry::default()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_timer(ChronoUtc::rfc_3339()),
                )
                .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
                .try_init()?;
        } else {
            Registry::default()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false),
                )
                .with(
                    fmt::layer()
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(true),
                )
                .try_init()?;
        }
        return Ok(Some(guard));
    }

    // 仅控制台日志
    if config.format == "json" {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()?;
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init()?;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_path(path: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            level: "info".into(),
            format: "text".into(),
            enable_file_logging: true,
            log_file_path: path.map(String::from),
        }
    }

    #[test]
    fn test_configured_file_name_is_used() {
        let (dir, name) = log_file_target(&config_with_path(Some("/var/log/basenames/run.log")));
        assert_eq!(dir, PathBuf::from("/var/log/basenames"));
        assert_eq!(name, "run.log");
    }

    #[test]
    fn test_bare_file_name_goes_to_default_dir() {
        let (dir, name) = log_file_target(&config_with_path(Some("batch.log")));
        assert_eq!(dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(name, "batch.log");
    }

    #[test]
    fn test_defaults_without_path() {
        let (dir, name) = log_file_target(&config_with_path(None));
        assert_eq!(dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(name, DEFAULT_LOG_FILE);
    }
}
