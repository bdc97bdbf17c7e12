/*!
 * git 领域：通过 git 命令行执行只读查询和提交
 *
 * 参数到 git argv 的转换是纯函数（GitAction::build_args），
 * 同时用作执行前的参数校验。
 */

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::command::definition::{CommandDefinition, CommandHandler, HandlerOutput, Validatable};
use crate::plugin::CommandPlugin;
use crate::resolver::{DomainDescriptor, PatternExtractor};
use crate::utils::error::{app_error, AppResult};

pub const GIT_DOMAIN: &str = "git";
pub const GIT_PLUGIN_ID: &str = "builtin.git";

const DEFAULT_LOG_COUNT: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    #[error("git is not installed or not on PATH")]
    NotInstalled,

    #[error("not a git repository")]
    NotARepository,

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl GitError {
    fn is_not_a_repository(stderr: &str) -> bool {
        let msg = stderr.to_lowercase();
        msg.contains("not a git repository") || (msg.contains("fatal:") && msg.contains("repository"))
    }
}

/// git 命令行封装
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    workdir: Option<PathBuf>,
}

impl GitCli {
    pub fn new(workdir: Option<PathBuf>) -> Self {
        Self { workdir }
    }

    pub async fn execute(&self, args: &[String]) -> Result<String, GitError> {
        let mut cmd = AsyncCommand::new("git");
        cmd.args(args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        debug!("执行 git {:?}", args);

        let output = cmd.output().await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => GitError::NotInstalled,
            _ => GitError::Io(e.to_string()),
        })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if GitError::is_not_a_repository(&stderr) {
            return Err(GitError::NotARepository);
        }
        Err(GitError::CommandFailed {
            command: args.first().cloned().unwrap_or_default(),
            stderr: if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitAction {
    Status,
    Branch,
    Log,
    Diff,
    Commit,
}

impl GitAction {
    pub fn id(&self) -> &'static str {
        match self {
            GitAction::Status => "status",
            GitAction::Branch => "branch",
            GitAction::Log => "log",
            GitAction::Diff => "diff",
            GitAction::Commit => "commit",
        }
    }

    /// 命令参数 → git argv
    pub fn build_args(&self, args: &[String]) -> Result<Vec<String>, String> {
        let argv = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        match self {
            GitAction::Status => {
                no_args(args)?;
                Ok(argv(&["status", "--short", "--branch"]))
            }
            GitAction::Branch => {
                no_args(args)?;
                Ok(argv(&["branch", "--list"]))
            }
            GitAction::Log => {
                let count = parse_log_count(args)?;
                let mut out = argv(&["log", "--oneline", "--no-color"]);
                out.push(format!("--max-count={}", count));
                Ok(out)
            }
            GitAction::Diff => {
                let mut staged = false;
                let mut paths = Vec::new();
                for arg in args {
                    match arg.as_str() {
                        "--staged" | "--cached" => staged = true,
                        other if other.starts_with('-') => {
                            return Err(format!("unsupported option `{}`", other))
                        }
                        other => paths.push(other.to_string()),
                    }
                }
                if paths.len() > 1 {
                    return Err("expected at most one path".to_string());
                }
                let mut out = argv(&["diff", "--no-color"]);
                if staged {
                    out.push("--staged".to_string());
                }
                if !paths.is_empty() {
                    out.push("--".to_string());
                    out.extend(paths);
                }
                Ok(out)
            }
            GitAction::Commit => {
                let message = match args {
                    [flag, message] if flag == "-m" => message.clone(),
                    [flag, ..] if flag == "-m" => return Err("`-m` expects one message".to_string()),
                    [] => return Err("a commit message is required (-m <msg>)".to_string()),
                    words => words.join(" "),
                };
                if message.trim().is_empty() {
                    return Err("commit message must not be empty".to_string());
                }
                Ok(vec!["commit".to_string(), "-m".to_string(), message])
            }
        }
    }
}

fn no_args(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(format!("takes no arguments, got {}", args.len()))
    }
}

fn parse_log_count(args: &[String]) -> Result<usize, String> {
    let parse = |s: &str| {
        s.parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid commit count `{}`", s))
    };

    match args {
        [] => Ok(DEFAULT_LOG_COUNT),
        [flag, n] if flag == "-n" => parse(n),
        [single] => {
            if let Some(n) = single.strip_prefix("--max-count=") {
                parse(n)
            } else if let Some(n) = single.strip_prefix("-n") {
                parse(n)
            } else {
                Err(format!("unexpected argument `{}`", single))
            }
        }
        _ => Err("usage: @git:log [-n N]".to_string()),
    }
}

struct GitHandler {
    action: GitAction,
    cli: Arc<GitCli>,
}

impl Validatable for GitHandler {
    fn validate(&self, args: &[String]) -> Result<(), String> {
        self.action.build_args(args).map(|_| ())
    }
}

#[async_trait]
impl CommandHandler for GitHandler {
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput> {
        let argv = self
            .action
            .build_args(args)
            .map_err(app_error)?;
        let stdout = self.cli.execute(&argv).await?;
        let text = stdout.trim_end();
        Ok(HandlerOutput::Text(if text.is_empty() {
            "(no output)".to_string()
        } else {
            text.to_string()
        }))
    }

    fn validator(&self) -> Option<&dyn Validatable> {
        Some(self)
    }
}

pub struct GitPlugin {
    cli: Arc<GitCli>,
}

impl GitPlugin {
    pub fn new(cli: GitCli) -> Self {
        Self { cli: Arc::new(cli) }
    }

    fn definition(&self, action: GitAction) -> CommandDefinition {
        CommandDefinition::new(
            GIT_DOMAIN,
            action.id(),
            GitHandler {
                action,
                cli: Arc::clone(&self.cli),
            },
        )
        .tags(["vcs"])
    }
}

impl CommandPlugin for GitPlugin {
    fn id(&self) -> &str {
        GIT_PLUGIN_ID
    }

    fn domain(&self) -> &str {
        GIT_DOMAIN
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        vec![
            self.definition(GitAction::Status)
                .description("Show working tree status")
                .examples(["@git:status"]),
            self.definition(GitAction::Branch)
                .description("List local branches"),
            self.definition(GitAction::Log)
                .syntax("@git:log [-n N]")
                .description("Show recent commits")
                .examples(["@git:log -n 5"]),
            self.definition(GitAction::Diff)
                .syntax("@git:diff [--staged] [path]")
                .description("Show changes")
                .examples(["@git:diff --staged", "@git:diff src/main.rs"]),
            self.definition(GitAction::Commit)
                .syntax("@git:commit -m <message>")
                .description("Commit staged changes")
                .examples(["@git:commit -m \"fix typo\""])
                .requires_confirmation(),
        ]
    }

    fn descriptor(&self) -> Option<DomainDescriptor> {
        Some(
            DomainDescriptor::new(GIT_DOMAIN, "status")
                .triggers("status", ["status", "changes", "what changed", "상태", "변경 사항"])
                .triggers("branch", ["branches", "current branch", "브랜치"])
                .triggers("log", ["history", "recent commits", "커밋 기록", "로그"])
                .triggers("diff", ["diff", "difference", "차이", "변경 내용"])
                .triggers("commit", ["commit", "커밋해"])
                .extractor(
                    PatternExtractor::new()
                        .rule(&["log"], r"(?i)(\d+)\s*(?:개|commits?)", "--max-count=$1")
                        .rule(&["diff"], r"(?i)\b(?:staged|cached)\b|스테이징", "--staged"),
                ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_build_args_simple() {
        assert_eq!(
            GitAction::Status.build_args(&[]).unwrap(),
            s(&["status", "--short", "--branch"])
        );
        assert!(GitAction::Branch.build_args(&s(&["x"])).is_err());
    }

    #[test]
    fn test_build_args_log() {
        assert_eq!(
            GitAction::Log.build_args(&[]).unwrap().last().unwrap(),
            "--max-count=10"
        );
        for args in [s(&["-n", "5"]), s(&["-n5"]), s(&["--max-count=5"])] {
            assert_eq!(
                GitAction::Log.build_args(&args).unwrap().last().unwrap(),
                "--max-count=5"
            );
        }
        assert!(GitAction::Log.build_args(&s(&["-n", "0"])).is_err());
        assert!(GitAction::Log.build_args(&s(&["--all"])).is_err());
    }

    #[test]
    fn test_build_args_diff() {
        assert_eq!(
            GitAction::Diff.build_args(&s(&["--staged", "src/lib.rs"])).unwrap(),
            s(&["diff", "--no-color", "--staged", "--", "src/lib.rs"])
        );
        assert!(GitAction::Diff.build_args(&s(&["--force"])).is_err());
        assert!(GitAction::Diff.build_args(&s(&["a", "b"])).is_err());
    }

    #[test]
    fn test_build_args_commit() {
        assert_eq!(
            GitAction::Commit.build_args(&s(&["-m", "fix the bug"])).unwrap(),
            s(&["commit", "-m", "fix the bug"])
        );
        assert_eq!(
            GitAction::Commit.build_args(&s(&["quick", "fix"])).unwrap(),
            s(&["commit", "-m", "quick fix"])
        );
        assert!(GitAction::Commit.build_args(&[]).is_err());
        assert!(GitAction::Commit.build_args(&s(&["-m"])).is_err());
        assert!(GitAction::Commit.build_args(&s(&["-m", "  "])).is_err());
    }

    #[test]
    fn test_not_a_repository_detection() {
        assert!(GitError::is_not_a_repository(
            "fatal: not a git repository (or any of the parent directories): .git"
        ));
        assert!(!GitError::is_not_a_repository("error: pathspec 'x' did not match"));
    }

    #[test]
    fn test_plugin_commands() {
        let plugin = GitPlugin::new(GitCli::default());
        let commands = plugin.commands();
        let ids: Vec<&str> = commands.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["status", "branch", "log", "diff", "commit"]);
        assert!(commands.iter().all(|c| c.tags.iter().any(|t| t == "vcs")));
        assert!(commands.iter().find(|c| c.id == "commit").unwrap().requires_confirmation);
        assert!(commands[0].handler.validator().is_some());
    }

    #[test]
    fn test_descriptor_extracts_counts_and_flags() {
        let descriptor = GitPlugin::new(GitCli::default()).descriptor().unwrap();
        assert_eq!(
            descriptor.extract_args("log", "최근 5개 커밋 기록"),
            vec!["--max-count=5"]
        );
        assert_eq!(descriptor.extract_args("diff", "show staged diff"), vec!["--staged"]);
        assert_eq!(
            descriptor.extract_args("commit", "커밋해 \"fix typo\""),
            vec!["fix typo"]
        );
    }

    #[tokio::test]
    async fn test_missing_workdir_is_an_error() {
        let cli = GitCli::new(Some(PathBuf::from("/definitely/not/a/dir")));
        assert!(cli.execute(&s(&["status"])).await.is_err());
    }
}
