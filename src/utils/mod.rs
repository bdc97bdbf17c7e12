// 工具模块

pub mod error;
pub mod logging;

pub use error::{app_error, error_chain, AppError, AppResult};
pub use logging::init_logging;
