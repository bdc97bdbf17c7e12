//! 具体评分器实现

use super::calculator::ScoreCalculator;
use super::context::ScoringContext;
use super::*;

/// 基础评分器
///
/// 每个可用命令都有的最低分
pub struct BaseScorer;

impl ScoreCalculator for BaseScorer {
    fn calculate(&self, _context: &ScoringContext<'_>) -> f64 {
        BASE_SCORE
    }

    fn name(&self) -> &'static str {
        "base"
    }
}

/// 时近性评分器
///
/// 最近使用过的领域和命令加分，越新加分越多（按名次倒数衰减）
pub struct RecencyScorer;

impl RecencyScorer {
    fn rank_factor(rank: usize) -> f64 {
        1.0 / (rank as f64 + 1.0)
    }
}

impl ScoreCalculator for RecencyScorer {
    fn calculate(&self, context: &ScoringContext<'_>) -> f64 {
        let mut score = 0.0;

        if let Some(rank) = context.domain_recency_rank() {
            score += Self::rank_factor(rank) * RECENT_DOMAIN_WEIGHT;
        }
        if let Some(rank) = context.command_recency_rank() {
            score += Self::rank_factor(rank) * RECENT_COMMAND_WEIGHT;
        }

        clamp_score(score)
    }

    fn name(&self) -> &'static str {
        "recency"
    }
}

/// 工作区评分器
///
/// 根据当前文件类型和 VCS 分支状态加分
pub struct WorkspaceScorer;

impl ScoreCalculator for WorkspaceScorer {
    fn calculate(&self, context: &ScoringContext<'_>) -> f64 {
        let mut score = 0.0;

        if context.matches_file_type() {
            score += FILE_TYPE_BONUS;
        }
        if context.context.has_vcs_branch && context.is_vcs_command() {
            score += VCS_BRANCH_BONUS;
        }

        clamp_score(score)
    }

    fn name(&self) -> &'static str {
        "workspace"
    }
}

/// 组合评分器
///
/// 组合多个评分器的结果，支持可组合的评分策略
pub struct CompositeScorer {
    scorers: Vec<Box<dyn ScoreCalculator>>,
}

impl CompositeScorer {
    pub fn new(scorers: Vec<Box<dyn ScoreCalculator>>) -> Self {
        Self { scorers }
    }

    /// 创建默认的组合评分器
    pub fn default_composite() -> Self {
        Self::new(vec![
            Box::new(BaseScorer),
            Box::new(RecencyScorer),
            Box::new(WorkspaceScorer),
        ])
    }
}

impl ScoreCalculator for CompositeScorer {
    fn calculate(&self, context: &ScoringContext<'_>) -> f64 {
        let total: f64 = self
            .scorers
            .iter()
            .map(|scorer| {
                let score = scorer.calculate(context);
                tracing::trace!(scorer = scorer.name(), score, "partial score");
                score
            })
            .sum();

        clamp_score(total)
    }

    fn name(&self) -> &'static str {
        "composite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::definition::{handler_fn, CommandDefinition, HandlerOutput};

    fn tagged(domain: &str, id: &str, tags: &[&str]) -> CommandDefinition {
        CommandDefinition::new(
            domain,
            id,
            handler_fn(|_| async { Ok(HandlerOutput::Text(String::new())) }),
        )
        .tags(tags.iter().copied())
    }

    #[test]
    fn test_recency_scorer_decays_by_rank() {
        let git = tagged("git", "status", &[]);
        let pocket = tagged("pocket", "ls", &[]);
        let ctx = SuggestionContext::default().with_recent_domains(["git", "pocket"]);

        let first = RecencyScorer.calculate(&ScoringContext::new(&git, &ctx));
        let second = RecencyScorer.calculate(&ScoringContext::new(&pocket, &ctx));
        assert_eq!(first, RECENT_DOMAIN_WEIGHT);
        assert_eq!(second, RECENT_DOMAIN_WEIGHT / 2.0);
    }

    #[test]
    fn test_workspace_scorer() {
        let commit = tagged("git", "commit", &["vcs"]);
        let no_branch = SuggestionContext::default();
        let on_branch = SuggestionContext::default().with_vcs_branch(true);

        assert_eq!(
            WorkspaceScorer.calculate(&ScoringContext::new(&commit, &no_branch)),
            0.0
        );
        assert_eq!(
            WorkspaceScorer.calculate(&ScoringContext::new(&commit, &on_branch)),
            VCS_BRANCH_BONUS
        );

        let cat = tagged("pocket", "cat", &["md"]);
        let md = SuggestionContext::default().with_file_type("md");
        assert_eq!(
            WorkspaceScorer.calculate(&ScoringContext::new(&cat, &md)),
            FILE_TYPE_BONUS
        );
    }

    #[test]
    fn test_composite_sums_and_clamps() {
        let def = tagged("git", "status", &["vcs", "rs"]);
        let ctx = SuggestionContext::default()
            .with_file_type("rs")
            .with_vcs_branch(true)
            .with_recent_domains(["git"])
            .with_recent_commands(["@git:status"]);

        let score = CompositeScorer::default_composite().calculate(&ScoringContext::new(&def, &ctx));
        let expected = BASE_SCORE
            + RECENT_DOMAIN_WEIGHT
            + RECENT_COMMAND_WEIGHT
            + FILE_TYPE_BONUS
            + VCS_BRANCH_BONUS;
        assert_eq!(score, clamp_score(expected));
        assert!(score <= MAX_SCORE);
    }
}
