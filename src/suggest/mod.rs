//! 命令推荐评分系统
//!
//! 为 `CommandRegistry::suggest_commands` 提供确定性的评分：
//! 相同的上下文总是得到相同的排序。
//!
//! # 架构
//!
//! ```text
//! SuggestionContext (宿主数据) + CommandDefinition
//!     ↓
//! ScoringContext
//!     ↓
//! BaseScorer / RecencyScorer / WorkspaceScorer
//!     ↓
//! CompositeScorer (组合)
//! ```

pub mod calculator;
pub mod context;
pub mod scorers;

use std::sync::Arc;

pub use calculator::ScoreCalculator;
pub use context::{ScoringContext, SuggestionContext};
pub use scorers::{BaseScorer, CompositeScorer, RecencyScorer, WorkspaceScorer};

use crate::command::definition::CommandDefinition;

/// 基础分数 - 任何可用命令的最低分
pub const BASE_SCORE: f64 = 10.0;

/// 最近使用领域的权重
pub const RECENT_DOMAIN_WEIGHT: f64 = 30.0;

/// 最近执行命令的权重
pub const RECENT_COMMAND_WEIGHT: f64 = 25.0;

/// 文件类型匹配加分
pub const FILE_TYPE_BONUS: f64 = 20.0;

/// 处于 VCS 分支时 VCS 命令加分
pub const VCS_BRANCH_BONUS: f64 = 15.0;

/// 最大分数上限
pub const MAX_SCORE: f64 = 100.0;

/// 确保分数在有效范围内
#[inline]
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, MAX_SCORE)
}

/// 对候选命令评分并返回前 `limit` 个完整命令名
///
/// 同分时保持候选的原始顺序（稳定排序），保证结果确定。
pub fn rank_commands(
    candidates: &[Arc<CommandDefinition>],
    context: &SuggestionContext,
    scorer: &dyn ScoreCalculator,
    limit: usize,
) -> Vec<String> {
    let mut scored: Vec<(f64, &Arc<CommandDefinition>)> = candidates
        .iter()
        .map(|def| (scorer.calculate(&ScoringContext::new(def, context)), def))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, def)| def.qualified_name())
        .collect()
}
