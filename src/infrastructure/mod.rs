pub mod log_redact;
pub mod logging;
pub mod shutdown; // 取消信号（Ctrl+C）
