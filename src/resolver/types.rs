/*!
 * 自然语言转换结果
 */

use serde::{Deserialize, Serialize};

use crate::command::types::Command;

/// 转换结果的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionOrigin {
    /// 关键词匹配（第一阶段）
    Heuristic,
    /// 语言模型（第二阶段）
    Model,
    /// 两个阶段都没有给出可用结果
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionAlternative {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub confidence: f64,
}

/// 自由文本到某个领域动作的映射，附带置信度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConversion {
    /// 领域内的动作 id（不带前缀）
    pub command: String,
    pub args: Vec<String>,
    /// 0.0 ~ 1.0
    pub confidence: f64,
    pub explanation: String,
    /// 按置信度降序，且都不高于 `confidence`
    pub alternatives: Vec<ConversionAlternative>,
    pub origin: ConversionOrigin,
    /// 使用了领域默认动作
    pub ambiguous: bool,
}

impl CommandConversion {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        confidence: f64,
        origin: ConversionOrigin,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            confidence: clamp_confidence(confidence),
            explanation: String::new(),
            alternatives: Vec::new(),
            origin,
            ambiguous: false,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// 转成可执行的命令；动作为空（未知领域）时返回 None
    pub fn to_command(&self, domain: &str) -> Option<Command> {
        if self.command.is_empty() || domain.is_empty() {
            return None;
        }
        Some(Command::for_domain(domain, self.command.clone(), self.args.clone()))
    }

    /// 给用户看的解释，例如 "Interpreted as `@pocket:ls docs/` (confidence 0.64)"
    pub fn interpreted_as(&self, domain: &str) -> String {
        match self.to_command(domain) {
            Some(command) => format!(
                "Interpreted as `{}` (confidence {:.2})",
                command.to_command_line(),
                self.confidence
            ),
            None => format!("No interpretation in @{}", domain),
        }
    }
}

/// NaN 视为 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::types::CommandPrefix;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(
            CommandConversion::new("ls", vec![], 1.7, ConversionOrigin::Model).confidence,
            1.0
        );
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn test_interpreted_as() {
        let conv = CommandConversion::new(
            "ls",
            vec!["docs/".into()],
            0.64,
            ConversionOrigin::Heuristic,
        );
        assert_eq!(
            conv.interpreted_as("pocket"),
            "Interpreted as `@pocket:ls docs/` (confidence 0.64)"
        );

        let help = CommandConversion::new("help", vec![], 0.9, ConversionOrigin::Model);
        assert_eq!(help.to_command("system").unwrap().prefix, CommandPrefix::Slash);

        let empty = CommandConversion::new("", vec![], 0.0, ConversionOrigin::Fallback);
        assert!(empty.to_command("nowhere").is_none());
        assert_eq!(empty.interpreted_as("nowhere"), "No interpretation in @nowhere");
    }

    #[test]
    fn test_serializes_camel_case() {
        let conv = CommandConversion::new("build", vec![], 0.5, ConversionOrigin::Fallback);
        let value = serde_json::to_value(&conv).unwrap();
        assert_eq!(value["origin"], "fallback");
        assert_eq!(value["ambiguous"], false);
        assert!(value["alternatives"].as_array().unwrap().is_empty());
    }
}
