/*!
 * 命令管线
 *
 * 一行输入 → 路由 → (自然语言解析) → 执行。
 * 自然语言解释只有在置信度足够、不含糊且命令不需要确认时才自动执行，
 * 否则把解释交回调用方确认。
 */

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::command::executor::CommandExecutor;
use crate::command::parser::{CommandParser, Route};
use crate::command::types::{Command, ErrorKind, ExecutionResult};
use crate::config::PipelineSettings;
use crate::resolver::{CommandConversion, NaturalLanguageResolver};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// 显式命令，已执行
    Executed {
        command: Command,
        result: ExecutionResult,
    },
    /// 自然语言解释后自动执行
    Interpreted {
        domain: String,
        conversion: CommandConversion,
        command: Command,
        result: ExecutionResult,
    },
    /// 需要用户确认后再调用 [`CommandPipeline::confirm`]
    ///
    /// 回退到默认动作时 `warning` 为 `ConversionAmbiguous`
    NeedsConfirmation {
        domain: String,
        conversion: CommandConversion,
        command: Command,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<ErrorKind>,
    },
    /// 领域内没有任何可用命令，无法解释
    Unresolved {
        domain: String,
        conversion: CommandConversion,
    },
    NotACommand { text: String },
}

pub const LOW_CONFIDENCE_BANNER: &str = "Low confidence: please check the interpretation below.";

impl PipelineOutcome {
    /// 执行结果（如果执行过）
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            PipelineOutcome::Executed { result, .. } | PipelineOutcome::Interpreted { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// 渲染成给终端用户看的文本
    pub fn render(&self) -> String {
        match self {
            PipelineOutcome::Executed { result, .. } => result.content.clone(),
            PipelineOutcome::Interpreted {
                domain,
                conversion,
                result,
                ..
            } => format!("{}\n{}", conversion.interpreted_as(domain), result.content),
            PipelineOutcome::NeedsConfirmation {
                domain,
                conversion,
                warning,
                ..
            } => {
                let mut text = String::new();
                if *warning == Some(ErrorKind::ConversionAmbiguous) {
                    text.push_str(LOW_CONFIDENCE_BANNER);
                    text.push('\n');
                }
                text.push_str(&conversion.interpreted_as(domain));
                if !conversion.explanation.is_empty() {
                    text.push('\n');
                    text.push_str(&conversion.explanation);
                }
                text
            }
            PipelineOutcome::Unresolved { conversion, .. } => conversion.explanation.clone(),
            PipelineOutcome::NotACommand { .. } => {
                "Not a command. Use `@domain:action`, `@domain <request>` or `/help`.".to_string()
            }
        }
    }
}

pub struct CommandPipeline {
    executor: Arc<CommandExecutor>,
    resolver: Arc<NaturalLanguageResolver>,
    settings: PipelineSettings,
}

impl CommandPipeline {
    pub fn new(
        executor: Arc<CommandExecutor>,
        resolver: Arc<NaturalLanguageResolver>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            executor,
            resolver,
            settings,
        }
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    pub fn resolver(&self) -> &Arc<NaturalLanguageResolver> {
        &self.resolver
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn handle(&self, text: &str) -> PipelineOutcome {
        match CommandParser::route(text) {
            Route::Command(command) => {
                let result = self.executor.execute(&command).await;
                PipelineOutcome::Executed { command, result }
            }
            Route::DomainText { domain, text } => self.interpret(domain, &text).await,
            Route::Chat(text) => PipelineOutcome::NotACommand { text },
        }
    }

    /// 执行用户确认过的命令
    pub async fn confirm(&self, command: &Command) -> ExecutionResult {
        info!("用户确认执行 {}", command.syntax());
        self.executor.execute(command).await
    }

    async fn interpret(&self, domain: String, text: &str) -> PipelineOutcome {
        let conversion = self.resolver.convert(&domain, text).await;
        let Some(command) = conversion.to_command(&domain) else {
            return PipelineOutcome::Unresolved { domain, conversion };
        };

        if !self.should_auto_execute(&conversion, &command) {
            debug!(
                "{} 需要确认 (confidence {:.2}, ambiguous {})",
                command.syntax(),
                conversion.confidence,
                conversion.ambiguous
            );
            let warning = conversion.ambiguous.then_some(ErrorKind::ConversionAmbiguous);
            return PipelineOutcome::NeedsConfirmation {
                domain,
                conversion,
                command,
                warning,
            };
        }

        let result = self.executor.execute(&command).await;
        PipelineOutcome::Interpreted {
            domain,
            conversion,
            command,
            result,
        }
    }

    fn should_auto_execute(&self, conversion: &CommandConversion, command: &Command) -> bool {
        if conversion.ambiguous || conversion.confidence < self.settings.auto_execute_threshold {
            return false;
        }
        !self
            .executor
            .registry()
            .resolve(&command.domain, &command.action)
            .is_some_and(|definition| definition.requires_confirmation)
    }
}
