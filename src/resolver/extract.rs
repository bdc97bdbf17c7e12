//! 参数提取
//!
//! 先取引号内的子串，再按领域的正则规则补充。结果去重并保持出现顺序。

use regex::Regex;
use tracing::warn;

/// 从自由文本中为某个动作提取位置参数
pub trait ArgExtractor: Send + Sync {
    fn extract(&self, action: &str, text: &str) -> Vec<String>;
}

impl<F> ArgExtractor for F
where
    F: Fn(&str, &str) -> Vec<String> + Send + Sync,
{
    fn extract(&self, action: &str, text: &str) -> Vec<String> {
        self(action, text)
    }
}

/// 双引号或单引号包围的子串（不处理转义，未闭合的引号忽略）
pub fn quoted_substrings(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some((offset, ch)) = text[pos..]
        .char_indices()
        .find(|&(_, c)| c == '"' || c == '\'')
    {
        let start = pos + offset;
        let body_start = start + ch.len_utf8();
        // 单引号只在词首才算引号，避免把 don't 之类的撇号当成参数边界
        if ch == '\'' && text[..start].chars().last().is_some_and(|c| !c.is_whitespace()) {
            pos = body_start;
            continue;
        }
        let Some(len) = text[body_start..].find(ch) else {
            break;
        };
        let body = &text[body_start..body_start + len];
        if !body.trim().is_empty() {
            out.push(body.to_string());
        }
        pos = body_start + len + ch.len_utf8();
    }
    out
}

struct PatternRule {
    /// 为空表示适用于所有动作
    actions: Vec<String>,
    regex: Regex,
    /// `$1` 风格的替换模板
    template: String,
}

impl PatternRule {
    fn applies_to(&self, action: &str) -> bool {
        self.actions.is_empty() || self.actions.iter().any(|a| a == action)
    }
}

/// 引号子串 + 正则规则的组合提取器
pub struct PatternExtractor {
    rules: Vec<PatternRule>,
    quoted: bool,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            quoted: true,
        }
    }

    /// 不提取引号子串
    pub fn without_quoted(mut self) -> Self {
        self.quoted = false;
        self
    }

    /// 添加规则；`actions` 为空表示所有动作。无效的正则会被跳过并记录警告。
    pub fn rule(mut self, actions: &[&str], pattern: &str, template: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.rules.push(PatternRule {
                actions: actions.iter().map(|a| a.to_string()).collect(),
                regex,
                template: template.to_string(),
            }),
            Err(e) => warn!("忽略无效的提取规则 {}: {}", pattern, e),
        }
        self
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgExtractor for PatternExtractor {
    fn extract(&self, action: &str, text: &str) -> Vec<String> {
        let mut candidates: Vec<String> = if self.quoted {
            quoted_substrings(text)
        } else {
            Vec::new()
        };

        for rule in self.rules.iter().filter(|r| r.applies_to(action)) {
            for caps in rule.regex.captures_iter(text) {
                let mut value = String::new();
                caps.expand(&rule.template, &mut value);
                candidates.push(value.trim().to_string());
            }
        }

        let mut args: Vec<String> = Vec::with_capacity(candidates.len());
        for value in candidates {
            if !value.is_empty() && !args.contains(&value) {
                args.push(value);
            }
        }
        args
    }
}
