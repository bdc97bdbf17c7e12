/*!
 * Command value types shared by the parser, registry, executor and resolver.
 */

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Domain that every slash command belongs to.
pub const SYSTEM_DOMAIN: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPrefix {
    /// `@domain:action`
    At,
    /// `/action`, always in the system domain
    Slash,
}

impl CommandPrefix {
    pub fn as_char(&self) -> char {
        match self {
            CommandPrefix::At => '@',
            CommandPrefix::Slash => '/',
        }
    }

    pub fn for_domain(domain: &str) -> Self {
        if domain == SYSTEM_DOMAIN {
            CommandPrefix::Slash
        } else {
            CommandPrefix::At
        }
    }
}

/// A resolved action, ready for execution.
///
/// `At` commands always carry a non-empty domain; `Slash` commands always
/// live in [`SYSTEM_DOMAIN`]. Use the constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub prefix: CommandPrefix,
    pub domain: String,
    pub action: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn at(domain: impl Into<String>, action: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            prefix: CommandPrefix::At,
            domain: domain.into(),
            action: action.into(),
            args,
        }
    }

    pub fn slash(action: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            prefix: CommandPrefix::Slash,
            domain: SYSTEM_DOMAIN.to_string(),
            action: action.into(),
            args,
        }
    }

    /// Builds the command with the prefix that belongs to `domain`.
    pub fn for_domain(domain: &str, action: impl Into<String>, args: Vec<String>) -> Self {
        match CommandPrefix::for_domain(domain) {
            CommandPrefix::Slash => Self::slash(action, args),
            CommandPrefix::At => Self::at(domain, action, args),
        }
    }

    /// `@domain` with no action; the rest of the line is free text.
    pub fn is_bare_domain(&self) -> bool {
        self.prefix == CommandPrefix::At && self.action.is_empty()
    }

    /// Canonical head of the command without arguments, e.g. `@git:status` or `/help`.
    pub fn syntax(&self) -> String {
        match self.prefix {
            CommandPrefix::Slash => format!("/{}", self.action),
            CommandPrefix::At if self.action.is_empty() => format!("@{}", self.domain),
            CommandPrefix::At => format!("@{}:{}", self.domain, self.action),
        }
    }

    /// Full command line; arguments containing whitespace are re-quoted.
    pub fn to_command_line(&self) -> String {
        let mut line = self.syntax();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownCommand,
    HandlerFailure,
    InvalidArguments,
    ConversionAmbiguous,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownCommand => "unknown_command",
            ErrorKind::HandlerFailure => "handler_failure",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::ConversionAmbiguous => "conversion_ambiguous",
        }
    }

    /// Whether retrying the same input could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::HandlerFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized outcome of running a command. The executor always produces one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl ExecutionResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
            error: false,
            error_kind: None,
            execution_time_ms: None,
        }
    }

    pub fn with_data(content: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::success(content)
        }
    }

    pub fn failure(kind: ErrorKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
            error: true,
            error_kind: Some(kind),
            execution_time_ms: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error
    }
}

/// Read-only projection of a command definition for help and autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandUsage {
    pub id: String,
    pub domain: String,
    pub prefix: CommandPrefix,
    pub syntax: String,
    pub description: String,
    pub examples: Vec<String>,
}
