// 日志系统模块

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::utils::error::{app_error, AppResult};

/// 初始化日志系统
/// RUST_LOG 环境变量优先，否则使用配置中的默认级别
pub fn init_logging(default_level: &str) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| app_error(format!("日志系统初始化失败: {}", e)))?;

    info!("日志系统初始化完成");
    Ok(())
}
