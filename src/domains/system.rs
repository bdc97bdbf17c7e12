/*!
 * system 领域（斜杠命令）：/help、/domains、/version、/suggest
 *
 * 处理器只持有注册表的弱引用，避免注册表 → 定义 → 处理器 → 注册表的循环。
 */

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::json;

use crate::command::definition::{Arity, CommandDefinition, CommandHandler, HandlerOutput, Validatable};
use crate::command::registry::CommandRegistry;
use crate::command::types::{CommandUsage, ExecutionResult, SYSTEM_DOMAIN};
use crate::plugin::CommandPlugin;
use crate::resolver::DomainDescriptor;
use crate::suggest::SuggestionContext;
use crate::utils::error::{app_error, AppResult};

pub const SYSTEM_PLUGIN_ID: &str = "builtin.system";

const DEFAULT_SUGGEST_LIMIT: usize = 5;

pub struct SystemPlugin {
    registry: Weak<CommandRegistry>,
}

impl SystemPlugin {
    pub fn new(registry: &Arc<CommandRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }
}

impl CommandPlugin for SystemPlugin {
    fn id(&self) -> &str {
        SYSTEM_PLUGIN_ID
    }

    fn domain(&self) -> &str {
        SYSTEM_DOMAIN
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        vec![
            CommandDefinition::new(SYSTEM_DOMAIN, "help", HelpHandler::new(self.registry.clone()))
                .syntax("/help [domain]")
                .description("List available commands, optionally for one domain")
                .examples(["/help", "/help pocket"])
                .aliases(["?"]),
            CommandDefinition::new(SYSTEM_DOMAIN, "domains", DomainsHandler(self.registry.clone()))
                .description("List registered domains"),
            CommandDefinition::new(SYSTEM_DOMAIN, "version", VersionHandler)
                .description("Show the version"),
            CommandDefinition::new(SYSTEM_DOMAIN, "suggest", SuggestHandler(self.registry.clone()))
                .syntax("/suggest [--file-type=EXT] [--vcs] [--recent=d1,d2] [--limit=N]")
                .description("Suggest commands for the current context")
                .examples(["/suggest --file-type=md", "/suggest --vcs --limit=3"]),
        ]
    }

    fn descriptor(&self) -> Option<DomainDescriptor> {
        Some(
            DomainDescriptor::new(SYSTEM_DOMAIN, "help")
                .triggers("help", ["help", "commands", "what can you do", "도움말", "명령어"])
                .triggers("domains", ["domains", "도메인"])
                .triggers("version", ["version", "버전"])
                .triggers("suggest", ["suggest", "recommend", "추천"]),
        )
    }
}

fn upgrade(registry: &Weak<CommandRegistry>) -> AppResult<Arc<CommandRegistry>> {
    registry
        .upgrade()
        .ok_or_else(|| app_error("command registry is no longer available"))
}

/// 把用法列表渲染成文本：按领域分组
pub fn render_usages(usages: &[CommandUsage]) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;
    for usage in usages {
        if current != Some(usage.domain.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", usage.domain));
            current = Some(usage.domain.as_str());
        }
        if usage.description.is_empty() {
            out.push_str(&format!("  {}\n", usage.syntax));
        } else {
            out.push_str(&format!("  {:<40} {}\n", usage.syntax, usage.description));
        }
    }
    out.trim_end().to_string()
}

struct HelpHandler {
    registry: Weak<CommandRegistry>,
    arity: Arity,
}

impl HelpHandler {
    fn new(registry: Weak<CommandRegistry>) -> Self {
        Self {
            registry,
            arity: Arity::between(0, 1),
        }
    }
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput> {
        let registry = upgrade(&self.registry)?;

        let usages = match args.first() {
            Some(domain) => {
                let domain = domain.trim_start_matches('@');
                let usages = registry.domain_usages(domain);
                if usages.is_empty() {
                    return Ok(HandlerOutput::Text(format!(
                        "No commands are registered for `{}`. Run `/domains` to list domains.",
                        domain
                    )));
                }
                usages
            }
            None => registry.all_usages(),
        };

        Ok(ExecutionResult::with_data(render_usages(&usages), json!(usages)).into())
    }

    fn validator(&self) -> Option<&dyn Validatable> {
        Some(&self.arity)
    }
}

struct DomainsHandler(Weak<CommandRegistry>);

#[async_trait]
impl CommandHandler for DomainsHandler {
    async fn execute(&self, _args: &[String]) -> AppResult<HandlerOutput> {
        let registry = upgrade(&self.0)?;
        let domains = registry.domains();
        Ok(HandlerOutput::Json(json!({
            "content": domains.join(", "),
            "domains": domains,
        })))
    }
}

struct VersionHandler;

#[async_trait]
impl CommandHandler for VersionHandler {
    async fn execute(&self, _args: &[String]) -> AppResult<HandlerOutput> {
        Ok(HandlerOutput::Text(format!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )))
    }
}

struct SuggestHandler(Weak<CommandRegistry>);

/// `/suggest` 的参数解析，未知参数报错
pub fn parse_suggest_args(args: &[String]) -> Result<(SuggestionContext, usize), String> {
    let mut context = SuggestionContext::default();
    let mut limit = DEFAULT_SUGGEST_LIMIT;

    for arg in args {
        if let Some(ext) = arg.strip_prefix("--file-type=") {
            context.active_file_type = Some(ext.to_string());
        } else if arg == "--vcs" {
            context.has_vcs_branch = true;
        } else if let Some(list) = arg.strip_prefix("--recent=") {
            context.recent_domains = list
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(n) = arg.strip_prefix("--limit=") {
            limit = n
                .parse()
                .map_err(|_| format!("invalid --limit value `{}`", n))?;
        } else {
            return Err(format!("unexpected argument `{}`", arg));
        }
    }
    Ok((context, limit))
}

struct SuggestArgs;

impl Validatable for SuggestArgs {
    fn validate(&self, args: &[String]) -> Result<(), String> {
        parse_suggest_args(args).map(|_| ())
    }
}

#[async_trait]
impl CommandHandler for SuggestHandler {
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput> {
        let registry = upgrade(&self.0)?;
        let (context, limit) = parse_suggest_args(args).map_err(app_error)?;
        let suggestions = registry.suggest_commands(&context, limit);
        Ok(ExecutionResult::with_data(suggestions.join("\n"), json!(suggestions)).into())
    }

    fn validator(&self) -> Option<&dyn Validatable> {
        Some(&SuggestArgs)
    }
}
