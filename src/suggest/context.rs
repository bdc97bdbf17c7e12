//! 评分上下文
//!
//! SuggestionContext 是宿主传入的环境信息；ScoringContext 把它和单个候选命令配对，
//! 评分器只读取数据，不混入评分逻辑。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::definition::CommandDefinition;

/// 宿主环境信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionContext {
    /// 当前活动文件类型（如 "rs"、"md"）
    pub active_file_type: Option<String>,

    /// 工作区是否处于某个 VCS 分支上
    pub has_vcs_branch: bool,

    /// 最近使用的领域，越靠前越新
    pub recent_domains: Vec<String>,

    /// 最近执行的完整命令名（如 "@git:status"），越靠前越新
    pub recent_commands: Vec<String>,
}

impl SuggestionContext {
    /// 从宿主传入的 JSON 构建，无法识别的字段忽略，格式错误时退回默认值
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.active_file_type = Some(file_type.into());
        self
    }

    pub fn with_vcs_branch(mut self, has_branch: bool) -> Self {
        self.has_vcs_branch = has_branch;
        self
    }

    pub fn with_recent_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recent_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recent_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recent_commands = commands.into_iter().map(Into::into).collect();
        self
    }
}

/// 单个候选命令的评分上下文
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub candidate: &'a CommandDefinition,
    pub context: &'a SuggestionContext,
}

impl<'a> ScoringContext<'a> {
    pub fn new(candidate: &'a CommandDefinition, context: &'a SuggestionContext) -> Self {
        Self { candidate, context }
    }

    /// 候选命令所在领域在最近使用列表中的位置
    pub fn domain_recency_rank(&self) -> Option<usize> {
        self.context
            .recent_domains
            .iter()
            .position(|d| d == &self.candidate.domain)
    }

    /// 候选命令本身在最近执行列表中的位置
    pub fn command_recency_rank(&self) -> Option<usize> {
        let name = self.candidate.qualified_name();
        self.context.recent_commands.iter().position(|c| c == &name)
    }

    /// 候选命令的标签是否包含当前文件类型
    pub fn matches_file_type(&self) -> bool {
        let Some(file_type) = self.context.active_file_type.as_deref() else {
            return false;
        };
        let file_type = file_type.trim_start_matches('.');
        !file_type.is_empty()
            && self
                .candidate
                .tags
                .iter()
                .any(|t| t.trim_start_matches('.').eq_ignore_ascii_case(file_type))
    }

    pub fn is_vcs_command(&self) -> bool {
        self.candidate.tags.iter().any(|t| t == "vcs")
    }
}
