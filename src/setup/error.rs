use thiserror::Error;

use crate::utils::error::AppError;

pub type SetupResult<T> = Result<T, SetupError>;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Config loading failed: {0:#}")]
    Config(AppError),
    #[error("Log system initialization failed: {0:#}")]
    Logging(AppError),
    #[error("Built-in plugin registration failed: {registered} of {expected} registered")]
    BuiltinPlugins { registered: usize, expected: usize },
}
