//! 领域的自然语言描述符
//!
//! 每个领域声明：默认动作、每个动作的触发短语（按目录顺序）、参数提取器。

use std::fmt;
use std::sync::Arc;

use super::extract::{ArgExtractor, PatternExtractor};

/// 单个动作的触发短语
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTriggers {
    pub action: String,
    pub phrases: Vec<String>,
}

#[derive(Clone)]
pub struct DomainDescriptor {
    pub domain: String,
    /// 两个阶段都失败时使用的动作
    pub default_action: String,
    /// 目录顺序，决定同分时的胜者
    pub actions: Vec<ActionTriggers>,
    extractor: Arc<dyn ArgExtractor>,
}

impl DomainDescriptor {
    pub fn new(domain: impl Into<String>, default_action: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            default_action: default_action.into(),
            actions: Vec::new(),
            extractor: Arc::new(PatternExtractor::new()),
        }
    }

    /// 追加触发短语；同一动作多次调用会合并
    pub fn triggers<I, S>(mut self, action: &str, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases.into_iter().map(Into::into);
        match self.actions.iter_mut().find(|a| a.action == action) {
            Some(existing) => existing.phrases.extend(phrases),
            None => self.actions.push(ActionTriggers {
                action: action.to_string(),
                phrases: phrases.collect(),
            }),
        }
        self
    }

    pub fn extractor(mut self, extractor: impl ArgExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn extract_args(&self, action: &str, text: &str) -> Vec<String> {
        self.extractor.extract(action, text)
    }

    pub fn phrases(&self, action: &str) -> &[String] {
        self.actions
            .iter()
            .find(|a| a.action == action)
            .map(|a| a.phrases.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Debug for DomainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainDescriptor")
            .field("domain", &self.domain)
            .field("default_action", &self.default_action)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}
