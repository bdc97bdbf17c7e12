/*!
 * NaturalLanguageResolver - 自然语言转命令
 *
 * 第一阶段：关键词匹配，分数超过阈值直接返回（置信度打折）。
 * 第二阶段：调用语言模型，带超时；回复中提取 JSON。
 * 任何失败都回退到第一阶段结果或领域默认动作，convert 本身永不失败。
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::descriptor::{ActionTriggers, DomainDescriptor};
use super::heuristic::{best_match, HeuristicMatch};
use super::json::extract_json;
use super::prompt::conversion_prompt;
use super::types::{clamp_confidence, CommandConversion, ConversionAlternative, ConversionOrigin};
use crate::command::definition::CommandDefinition;
use crate::command::error::CommandError;
use crate::command::parser::CommandParser;
use crate::command::registry::CommandRegistry;
use crate::config::ResolverConfig;
use crate::llm::ModelCapability;

/// 模型回复中缺少 confidence 时使用的值
pub const DEFAULT_MODEL_CONFIDENCE: f64 = 0.5;

pub struct NaturalLanguageResolver {
    registry: Arc<CommandRegistry>,
    model: Option<Arc<dyn ModelCapability>>,
    config: ResolverConfig,
}

impl NaturalLanguageResolver {
    pub fn new(registry: Arc<CommandRegistry>, config: ResolverConfig) -> Self {
        Self {
            registry,
            model: None,
            config,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ModelCapability>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn convert(&self, domain: &str, text: &str) -> CommandConversion {
        let definitions = self.registry.definitions(domain);
        if definitions.is_empty() {
            warn!("领域 {} 没有可用命令，无法解释输入", domain);
            let mut conversion =
                CommandConversion::new("", Vec::new(), 0.0, ConversionOrigin::Fallback)
                    .with_explanation(format!("No commands are registered for @{}", domain));
            conversion.ambiguous = true;
            return conversion;
        }

        let descriptor = self.registry.descriptor(domain).unwrap_or_else(|| {
            Arc::new(DomainDescriptor::new(domain, definitions[0].id.clone()))
        });
        let catalog = build_catalog(&descriptor, &definitions);
        let heuristic = best_match(&descriptor, &catalog, text);

        if let Some(m) = &heuristic {
            if m.score > self.config.high_confidence_threshold {
                debug!("关键词命中 {} (score {:.2})", m.action, m.score);
                return self.heuristic_conversion(m, format!("Matched \"{}\"", m.phrase));
            }
        }

        match self.query_model(domain, &definitions, text, heuristic.as_ref()).await {
            Ok(mut conversion) => {
                if let Some(m) = &heuristic {
                    conversion.alternatives.push(ConversionAlternative {
                        command: m.action.clone(),
                        args: m.args.clone(),
                        confidence: m.score * self.config.heuristic_dampening,
                    });
                }
                enforce_monotonic(&mut conversion);
                info!(
                    "模型解释 @{} 输入为 {} (confidence {:.2})",
                    domain, conversion.command, conversion.confidence
                );
                conversion
            }
            Err(err) => {
                warn!("模型阶段失败，使用回退结果: {}", err);
                self.fallback(&descriptor, &definitions, text, heuristic, &err)
            }
        }
    }

    async fn query_model(
        &self,
        domain: &str,
        definitions: &[Arc<CommandDefinition>],
        text: &str,
        hint: Option<&HeuristicMatch>,
    ) -> Result<CommandConversion, CommandError> {
        let model = self.model.as_ref().ok_or(CommandError::ModelUnavailable)?;

        let usages: Vec<_> = definitions.iter().map(|d| d.usage()).collect();
        let prompt = conversion_prompt(domain, &usages, text, hint);

        let timeout = Duration::from_secs(self.config.model_timeout_secs);
        let raw = tokio::time::timeout(timeout, model.query(&prompt))
            .await
            .map_err(|_| CommandError::ModelTimeout {
                timeout_secs: self.config.model_timeout_secs,
            })?
            .map_err(|e| CommandError::ModelRequest(format!("{:#}", e)))?;

        debug!("模型 {} 原始回复: {}", model.name(), raw);
        parse_model_response(&raw, domain, definitions)
    }

    fn heuristic_conversion(&self, m: &HeuristicMatch, explanation: String) -> CommandConversion {
        CommandConversion::new(
            m.action.clone(),
            m.args.clone(),
            m.score * self.config.heuristic_dampening,
            ConversionOrigin::Heuristic,
        )
        .with_explanation(explanation)
    }

    fn fallback(
        &self,
        descriptor: &DomainDescriptor,
        definitions: &[Arc<CommandDefinition>],
        text: &str,
        heuristic: Option<HeuristicMatch>,
        reason: &CommandError,
    ) -> CommandConversion {
        if let Some(m) = heuristic {
            return self.heuristic_conversion(
                &m,
                format!("Matched \"{}\" ({})", m.phrase, reason),
            );
        }

        let action = if definitions.iter().any(|d| d.id == descriptor.default_action) {
            descriptor.default_action.clone()
        } else {
            definitions[0].id.clone()
        };
        let args = descriptor.extract_args(&action, text);

        let mut conversion = CommandConversion::new(
            action.clone(),
            args,
            self.config.fallback_confidence,
            ConversionOrigin::Fallback,
        )
        .with_explanation(format!(
            "Could not interpret the request ({}); defaulting to `{}`",
            reason, action
        ));
        conversion.ambiguous = true;
        conversion
    }
}

/// 描述符中的动作（仅保留已注册的）按目录顺序在前，其余已注册动作随后
fn build_catalog(
    descriptor: &DomainDescriptor,
    definitions: &[Arc<CommandDefinition>],
) -> Vec<ActionTriggers> {
    let mut catalog: Vec<ActionTriggers> = descriptor
        .actions
        .iter()
        .filter(|a| definitions.iter().any(|d| d.id == a.action))
        .cloned()
        .collect();

    for definition in definitions {
        if !catalog.iter().any(|a| a.action == definition.id) {
            catalog.push(ActionTriggers {
                action: definition.id.clone(),
                phrases: Vec::new(),
            });
        }
    }
    catalog
}

/// 解析模型回复
///
/// 必须包含指向本领域动作的字符串 `command`；数组时取第一个元素。
pub fn parse_model_response(
    raw: &str,
    domain: &str,
    definitions: &[Arc<CommandDefinition>],
) -> Result<CommandConversion, CommandError> {
    let value = extract_json(raw)
        .ok_or_else(|| CommandError::ModelResponse("no JSON found in reply".into()))?;
    let object = match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| CommandError::ModelResponse("empty JSON array".into()))?,
        other => other,
    };
    if !object.is_object() {
        return Err(CommandError::ModelResponse("expected a JSON object".into()));
    }

    let command = object
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::ModelResponse("missing string field `command`".into()))?;
    let action = known_action(command, domain, definitions).ok_or_else(|| {
        CommandError::ModelResponse(format!("`{}` is not an action of @{}", command, domain))
    })?;

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE);
    let explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut conversion = CommandConversion::new(
        action,
        args_from_value(object.get("args")),
        confidence,
        ConversionOrigin::Model,
    )
    .with_explanation(explanation);

    if let Some(Value::Array(items)) = object.get("alternatives") {
        for item in items {
            let Some(name) = item.get("command").and_then(Value::as_str) else {
                continue;
            };
            let Some(action) = known_action(name, domain, definitions) else {
                debug!("丢弃未知的候选动作: {}", name);
                continue;
            };
            conversion.alternatives.push(ConversionAlternative {
                command: action,
                args: args_from_value(item.get("args")),
                confidence: item.get("confidence").and_then(Value::as_f64).unwrap_or(0.0),
            });
        }
    }

    Ok(conversion)
}

/// 接受 `ls`、`@pocket:ls`、`pocket:ls`、`/help` 以及别名，返回规范的动作 id
fn known_action(name: &str, domain: &str, definitions: &[Arc<CommandDefinition>]) -> Option<String> {
    let name = name.trim();
    let action = match name.strip_prefix('/') {
        Some(rest) => rest,
        None => {
            let rest = name.strip_prefix('@').unwrap_or(name);
            match rest.split_once(':') {
                Some((d, action)) if d == domain => action,
                Some(_) => return None,
                None => rest,
            }
        }
    };

    definitions
        .iter()
        .find(|d| d.id == action)
        .or_else(|| definitions.iter().find(|d| d.answers_to(action)))
        .map(|d| d.id.clone())
}

fn args_from_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => CommandParser::tokenize(s),
        _ => Vec::new(),
    }
}

/// 候选置信度限制在 [0, primary]，每个动作只保留一项且不与主结果重复，降序排列
pub fn enforce_monotonic(conversion: &mut CommandConversion) {
    let primary = conversion.confidence;
    let alternatives = std::mem::take(&mut conversion.alternatives);

    let mut kept: Vec<ConversionAlternative> = Vec::with_capacity(alternatives.len());
    for mut alt in alternatives {
        if alt.command == conversion.command || kept.iter().any(|k| k.command == alt.command) {
            continue;
        }
        alt.confidence = clamp_confidence(alt.confidence).min(primary);
        kept.push(alt);
    }
    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    conversion.alternatives = kept;
}
