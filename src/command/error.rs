/*!
 * 命令管线错误类型
 *
 * CommandError 用于管线内部传播；CommandErrorInfo 是可直接序列化的结构化形式，
 * 执行器把它放进失败结果的 data 字段。
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ErrorKind;
use crate::utils::error::{error_chain, AppError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("unknown command: {syntax}")]
    UnknownCommand { syntax: String },

    #[error("invalid arguments for {syntax}: {reason}")]
    InvalidArguments { syntax: String, reason: String },

    #[error("{domain}:{action} failed: {message}")]
    HandlerFailed {
        domain: String,
        action: String,
        message: String,
    },

    #[error("no language model configured")]
    ModelUnavailable,

    #[error("model call timed out after {timeout_secs}s")]
    ModelTimeout { timeout_secs: u64 },

    #[error("model call failed: {0}")]
    ModelRequest(String),

    #[error("model response rejected: {0}")]
    ModelResponse(String),

    #[error("plugin {plugin_id} rejected: {reason}")]
    PluginRejected { plugin_id: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandError {
    /// The user-facing kind, when this error surfaces in an execution result.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CommandError::UnknownCommand { .. } => Some(ErrorKind::UnknownCommand),
            CommandError::InvalidArguments { .. } => Some(ErrorKind::InvalidArguments),
            CommandError::HandlerFailed { .. } => Some(ErrorKind::HandlerFailure),
            _ => None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            CommandError::HandlerFailed { .. } => true,
            CommandError::ModelTimeout { .. } => true,
            CommandError::ModelRequest(_) => true,
            CommandError::UnknownCommand { .. } => false,
            CommandError::InvalidArguments { .. } => false,
            CommandError::ModelUnavailable => false,
            CommandError::ModelResponse(_) => false,
            CommandError::PluginRejected { .. } => false,
            CommandError::Json(_) => false,
        }
    }
}

/// Structured error carried inside failed execution results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl CommandErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// 从 anyhow 错误构建：顶层消息 + 展开的错误链
    pub fn from_app_error(kind: ErrorKind, err: &AppError) -> Self {
        Self {
            kind,
            message: err.to_string(),
            cause: error_chain(err),
        }
    }
}

impl From<&CommandError> for Option<CommandErrorInfo> {
    fn from(err: &CommandError) -> Self {
        err.kind()
            .map(|kind| CommandErrorInfo::new(kind, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_handler_failed_message_format() {
        let err = CommandError::HandlerFailed {
            domain: "swdp".into(),
            action: "build".into(),
            message: "portal offline".into(),
        };
        assert_eq!(err.to_string(), "swdp:build failed: portal offline");
        assert_eq!(err.kind(), Some(ErrorKind::HandlerFailure));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_internal_errors_have_no_kind() {
        assert!(CommandError::ModelUnavailable.kind().is_none());
        assert!(CommandError::ModelTimeout { timeout_secs: 5 }.is_recoverable());
    }

    #[test]
    fn test_info_from_app_error_keeps_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("connection refused"))
            .context("listing objects")
            .unwrap_err();
        let info = CommandErrorInfo::from_app_error(ErrorKind::HandlerFailure, &err);
        assert_eq!(info.message, "listing objects");
        assert_eq!(info.cause.as_deref(), Some("connection refused"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "handler_failure");
        assert_eq!(json["cause"], "connection refused");
    }

    #[test]
    fn test_info_from_command_error() {
        let err = CommandError::UnknownCommand {
            syntax: "@git:nope".into(),
        };
        let info: Option<CommandErrorInfo> = (&err).into();
        let info = info.unwrap();
        assert_eq!(info.kind, ErrorKind::UnknownCommand);
        assert!(info.message.contains("@git:nope"));
    }
}
