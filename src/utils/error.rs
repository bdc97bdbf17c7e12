/*!
 * 错误处理模块
 *
 * 基于 anyhow 的统一结果类型。命令处理器、后端与模型调用都返回 AppResult，
 * 管线边界（执行器、解析器）再把它们转换成结构化结果。
 */

use anyhow::{anyhow, Result as AnyhowResult};

/// 统一的应用程序结果类型
pub type AppResult<T> = AnyhowResult<T>;

/// 统一的应用程序错误类型
pub type AppError = anyhow::Error;

// ============================================================================
// 便捷的错误处理工具函数
// ============================================================================

/// 创建简单的应用程序错误
pub fn app_error(msg: impl Into<String>) -> AppError {
    anyhow!(msg.into())
}

/// 把错误链展开为 "外层: 内层" 形式，用于结构化错误的 cause 字段
pub fn error_chain(err: &AppError) -> Option<String> {
    let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
    if causes.is_empty() {
        None
    } else {
        Some(causes.join(": "))
    }
}

// ============================================================================
// 便捷的错误创建宏
// ============================================================================

/// 快速创建错误并返回
#[macro_export]
macro_rules! app_bail {
    ($msg:literal $(,)?) => {
        return Err(anyhow::anyhow!($msg))
    };
    ($err:expr $(,)?) => {
        return Err(anyhow::anyhow!($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err(anyhow::anyhow!($fmt, $($arg)*))
    };
}
