/*!
 * CommandExecutor - 命令执行器
 *
 * 查找 → 参数校验 → 调用处理器 → 归一化结果。
 * 任何失败（包括处理器 panic）都转成带 error_kind 的 ExecutionResult，绝不向调用方抛出。
 */

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::definition::{CommandDefinition, HandlerOutput};
use super::error::CommandErrorInfo;
use super::registry::CommandRegistry;
use super::telemetry::ExecutionTelemetry;
use super::types::{Command, CommandPrefix, ErrorKind, ExecutionResult, SYSTEM_DOMAIN};
use crate::utils::error::AppError;

pub struct CommandExecutor {
    registry: Arc<CommandRegistry>,
    telemetry: Arc<ExecutionTelemetry>,
}

impl CommandExecutor {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self::with_telemetry(registry, Arc::new(ExecutionTelemetry::new()))
    }

    pub fn with_telemetry(registry: Arc<CommandRegistry>, telemetry: Arc<ExecutionTelemetry>) -> Self {
        Self {
            registry,
            telemetry,
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn telemetry(&self) -> &Arc<ExecutionTelemetry> {
        &self.telemetry
    }

    #[instrument(skip(self, command), fields(command = %command.syntax(), args = command.args.len()))]
    pub async fn execute(&self, command: &Command) -> ExecutionResult {
        let start = Instant::now();
        let syntax = command.syntax();

        let mut result = match self.registry.resolve(&command.domain, &command.action) {
            Some(definition) => self.run(&definition, command).await,
            None => unknown_command(command),
        };

        // 处理器自己返回的失败结果可能没有标注类型
        if result.error && result.error_kind.is_none() {
            result.error_kind = Some(ErrorKind::HandlerFailure);
        }

        let elapsed = start.elapsed().as_millis() as u64;
        result.execution_time_ms = Some(elapsed);
        self.telemetry.record(&syntax, &result);

        if result.is_error() {
            debug!("命令 {} 执行失败: {:?}", syntax, result.error_kind);
        }
        result
    }

    async fn run(&self, definition: &CommandDefinition, command: &Command) -> ExecutionResult {
        if let Some(validator) = definition.handler.validator() {
            if let Err(reason) = validator.validate(&command.args) {
                warn!("参数校验失败 {}: {}", definition.qualified_name(), reason);
                let content = format!(
                    "Invalid arguments for `{}`: {}. Usage: {}",
                    command.syntax(),
                    reason,
                    definition.syntax
                );
                let info = CommandErrorInfo::new(ErrorKind::InvalidArguments, reason);
                return with_info(ExecutionResult::failure(ErrorKind::InvalidArguments, content), &info);
            }
        }

        let outcome = AssertUnwindSafe(definition.handler.execute(&command.args))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => normalize_output(output),
            Ok(Err(err)) => handler_failure(definition, &err),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("处理器 panic {}: {}", definition.qualified_name(), message);
                let info = CommandErrorInfo::new(ErrorKind::HandlerFailure, message.clone())
                    .with_cause("handler panicked");
                with_info(
                    ExecutionResult::failure(
                        ErrorKind::HandlerFailure,
                        format!("{}:{} failed: {}", definition.domain, definition.id, message),
                    ),
                    &info,
                )
            }
        }
    }
}

/// 把处理器的各种返回形式统一成 ExecutionResult
pub fn normalize_output(output: HandlerOutput) -> ExecutionResult {
    match output {
        HandlerOutput::Result(result) => result,
        HandlerOutput::Text(text) => ExecutionResult::success(text),
        HandlerOutput::Json(value) => {
            let content = match value.get("content").and_then(Value::as_str) {
                Some(content) => content.to_string(),
                None => match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            };
            ExecutionResult::with_data(content, value)
        }
    }
}

fn unknown_command(command: &Command) -> ExecutionResult {
    let help = match command.prefix {
        CommandPrefix::At if command.domain != SYSTEM_DOMAIN => format!("/help {}", command.domain),
        _ => "/help".to_string(),
    };
    let content = format!(
        "Unknown command `{}`. Run `{}` to list available commands.",
        command.syntax(),
        help
    );
    let info = CommandErrorInfo::new(ErrorKind::UnknownCommand, format!("unknown command: {}", command.syntax()));
    with_info(ExecutionResult::failure(ErrorKind::UnknownCommand, content), &info)
}

fn handler_failure(definition: &CommandDefinition, err: &AppError) -> ExecutionResult {
    error!("命令 {} 处理失败: {:#}", definition.qualified_name(), err);
    let info = CommandErrorInfo::from_app_error(ErrorKind::HandlerFailure, err);
    with_info(
        ExecutionResult::failure(
            ErrorKind::HandlerFailure,
            format!("{}:{} failed: {}", definition.domain, definition.id, err),
        ),
        &info,
    )
}

fn with_info(mut result: ExecutionResult, info: &CommandErrorInfo) -> ExecutionResult {
    result.data = serde_json::to_value(info).ok();
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
