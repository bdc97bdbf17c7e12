/*!
 * CommandDefinition & CommandHandler
 *
 * Handlers are async trait objects; optional argument validation is a separate
 * capability exposed through `CommandHandler::validator`.
 */

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{CommandPrefix, CommandUsage, ExecutionResult};
use crate::utils::error::AppResult;

/// Whatever a handler hands back; the executor normalizes it.
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    Result(ExecutionResult),
    Text(String),
    Json(Value),
}

impl From<ExecutionResult> for HandlerOutput {
    fn from(result: ExecutionResult) -> Self {
        HandlerOutput::Result(result)
    }
}

impl From<String> for HandlerOutput {
    fn from(text: String) -> Self {
        HandlerOutput::Text(text)
    }
}

impl From<&str> for HandlerOutput {
    fn from(text: &str) -> Self {
        HandlerOutput::Text(text.to_string())
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        HandlerOutput::Json(value)
    }
}

/// Argument validation a handler can opt into.
pub trait Validatable: Send + Sync {
    fn validate(&self, args: &[String]) -> Result<(), String>;
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput>;

    /// Default: no validation before `execute`
    fn validator(&self) -> Option<&dyn Validatable> {
        None
    }
}

/// Positional argument count bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }
}

impl Validatable for Arity {
    fn validate(&self, args: &[String]) -> Result<(), String> {
        let n = args.len();
        if n < self.min {
            return Err(format!(
                "expected at least {} argument(s), got {}",
                self.min, n
            ));
        }
        match self.max {
            Some(max) if n > max => Err(format!(
                "expected at most {} argument(s), got {}",
                max, n
            )),
            _ => Ok(()),
        }
    }
}

/// Closure-backed handler.
pub struct FnHandler<F> {
    f: F,
    arity: Option<Arity>,
}

impl<F> FnHandler<F> {
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }
}

/// Wraps an async closure `Vec<String> -> AppResult<HandlerOutput>` as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<HandlerOutput>> + Send + 'static,
{
    FnHandler { f, arity: None }
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<HandlerOutput>> + Send + 'static,
{
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput> {
        (self.f)(args.to_vec()).await
    }

    fn validator(&self) -> Option<&dyn Validatable> {
        self.arity.as_ref().map(|a| a as &dyn Validatable)
    }
}

/// A registrable capability. `(domain, id)` is the registry key.
#[derive(Clone)]
pub struct CommandDefinition {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub prefix: CommandPrefix,
    pub syntax: String,
    pub description: String,
    pub examples: Vec<String>,
    /// Extra names `resolve` accepts for this command
    pub aliases: Vec<String>,
    /// Contexts this command is relevant to (file types, `vcs`, ...), used for suggestions
    pub tags: Vec<String>,
    /// Side-effecting; never auto-run from a natural-language interpretation
    pub requires_confirmation: bool,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn new(
        domain: impl Into<String>,
        id: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self::with_handler(domain, id, Arc::new(handler))
    }

    pub fn with_handler(
        domain: impl Into<String>,
        id: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        let domain = domain.into();
        let id = id.into();
        let prefix = CommandPrefix::for_domain(&domain);
        let syntax = match prefix {
            CommandPrefix::Slash => format!("/{}", id),
            CommandPrefix::At => format!("@{}:{}", domain, id),
        };
        Self {
            name: id.clone(),
            id,
            domain,
            prefix,
            syntax,
            description: String::new(),
            examples: Vec::new(),
            aliases: Vec::new(),
            tags: Vec::new(),
            requires_confirmation: false,
            handler,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn syntax(mut self, syntax: impl Into<String>) -> Self {
        self.syntax = syntax.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn requires_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    /// `@domain:id` or `/id`
    pub fn qualified_name(&self) -> String {
        match self.prefix {
            CommandPrefix::Slash => format!("/{}", self.id),
            CommandPrefix::At => format!("@{}:{}", self.domain, self.id),
        }
    }

    pub fn answers_to(&self, action: &str) -> bool {
        self.id == action || self.aliases.iter().any(|a| a == action)
    }

    pub fn usage(&self) -> CommandUsage {
        CommandUsage {
            id: self.id.clone(),
            domain: self.domain.clone(),
            prefix: self.prefix,
            syntax: self.syntax.clone(),
            description: self.description.clone(),
            examples: self.examples.clone(),
        }
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .field("prefix", &self.prefix)
            .field("syntax", &self.syntax)
            .field("requires_confirmation", &self.requires_confirmation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> FnHandler<impl Fn(Vec<String>) -> futures::future::Ready<AppResult<HandlerOutput>>>
    {
        handler_fn(|args: Vec<String>| futures::future::ready(Ok(HandlerOutput::Text(args.join(" ")))))
    }

    #[test]
    fn test_defaults_follow_domain() {
        let def = CommandDefinition::new("system", "help", echo());
        assert_eq!(def.prefix, CommandPrefix::Slash);
        assert_eq!(def.syntax, "/help");
        assert_eq!(def.qualified_name(), "/help");

        let def = CommandDefinition::new("git", "status", echo()).syntax("@git:status [--short]");
        assert_eq!(def.prefix, CommandPrefix::At);
        assert_eq!(def.qualified_name(), "@git:status");
        assert_eq!(def.usage().syntax, "@git:status [--short]");
    }

    #[test]
    fn test_aliases() {
        let def = CommandDefinition::new("pocket", "ls", echo()).aliases(["list", "dir"]);
        assert!(def.answers_to("ls"));
        assert!(def.answers_to("dir"));
        assert!(!def.answers_to("cat"));
    }

    #[test]
    fn test_arity_validation() {
        let arity = Arity::between(1, 2);
        assert!(arity.validate(&[]).is_err());
        assert!(arity.validate(&["a".into()]).is_ok());
        assert!(arity.validate(&["a".into(), "b".into(), "c".into()]).is_err());
        assert!(Arity::at_least(0).validate(&vec!["x".to_string(); 10]).is_ok());
        assert!(Arity::exactly(1).validate(&[]).unwrap_err().contains("at least 1"));
    }

    #[tokio::test]
    async fn test_fn_handler_runs_and_exposes_validator() {
        let handler = echo().with_arity(Arity::exactly(2));
        assert!(handler.validator().is_some());
        let out = handler
            .execute(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert!(matches!(out, HandlerOutput::Text(ref t) if t == "a b"));

        assert!(echo().validator().is_none());
    }
}
