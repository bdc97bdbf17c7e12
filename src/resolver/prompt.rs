//! 第二阶段提示词
//!
//! 模板使用 `{variable}` 占位符；未提供的占位符原样保留。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::heuristic::HeuristicMatch;
use crate::command::types::CommandUsage;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("valid placeholder regex"));

const CONVERSION_TEMPLATE: &str = r#"You translate a user's request into one command of the "{domain}" domain.

Available actions:
{actions}

User request:
{input}
{hint}
Reply with a single JSON object and nothing else:
{"command": "<action id>", "args": ["<arg>", ...], "confidence": <0.0-1.0>, "explanation": "<short reason>", "alternatives": [{"command": "<action id>", "args": [], "confidence": <0.0-1.0>}]}"#;

/// 替换 `{name}` 占位符
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// 构建转换提示词：动作列表 + 原始输入 + 第一阶段的猜测（如果有）
pub fn conversion_prompt(
    domain: &str,
    usages: &[CommandUsage],
    input: &str,
    hint: Option<&HeuristicMatch>,
) -> String {
    let actions = usages
        .iter()
        .map(|u| {
            if u.description.is_empty() {
                format!("- {} ({})", u.id, u.syntax)
            } else {
                format!("- {}: {} ({})", u.id, u.description, u.syntax)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let hint = match hint {
        Some(m) => format!(
            "\nKeyword match suggests \"{}\" with args {:?} (score {:.2}).\n",
            m.action, m.args, m.score
        ),
        None => String::new(),
    };

    let vars: HashMap<&str, String> = HashMap::from([
        ("domain", domain.to_string()),
        ("actions", actions),
        ("input", input.trim().to_string()),
        ("hint", hint),
    ]);
    render(CONVERSION_TEMPLATE, &vars)
}
