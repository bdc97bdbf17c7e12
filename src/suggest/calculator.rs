//! 命令推荐的评分接口

use super::context::ScoringContext;

/// 给候选命令打分，分数越高越靠前
pub trait ScoreCalculator: Send + Sync {
    /// 计算候选命令在给定上下文中的分数（通常在 0.0 到 100.0 之间）
    fn calculate(&self, context: &ScoringContext<'_>) -> f64;

    /// 出现在 debug 日志里
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// 闭包评分器
impl<F> ScoreCalculator for F
where
    F: Fn(&ScoringContext<'_>) -> f64 + Send + Sync,
{
    fn calculate(&self, context: &ScoringContext<'_>) -> f64 {
        self(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::definition::{handler_fn, CommandDefinition, HandlerOutput};
    use crate::suggest::context::SuggestionContext;

    fn definition(domain: &str, id: &str) -> CommandDefinition {
        CommandDefinition::new(
            domain,
            id,
            handler_fn(|_| async { Ok(HandlerOutput::Text(String::new())) }),
        )
    }

    struct TestScorer {
        fixed_score: f64,
    }

    impl ScoreCalculator for TestScorer {
        fn calculate(&self, _context: &ScoringContext<'_>) -> f64 {
            self.fixed_score
        }

        fn name(&self) -> &'static str {
            "test"
        }
    }

    #[test]
    fn test_scorer_trait() {
        let scorer = TestScorer { fixed_score: 75.0 };
        let def = definition("git", "status");
        let ctx = SuggestionContext::default();

        assert_eq!(scorer.calculate(&ScoringContext::new(&def, &ctx)), 75.0);
        assert_eq!(scorer.name(), "test");
    }

    #[test]
    fn test_closure_scorer() {
        let scorer = |ctx: &ScoringContext<'_>| -> f64 {
            if ctx.candidate.domain == "git" {
                100.0
            } else {
                50.0
            }
        };

        let git = definition("git", "log");
        let pocket = definition("pocket", "ls");
        let ctx = SuggestionContext::default();

        assert_eq!(scorer.calculate(&ScoringContext::new(&git, &ctx)), 100.0);
        assert_eq!(scorer.calculate(&ScoringContext::new(&pocket, &ctx)), 50.0);
    }
}
