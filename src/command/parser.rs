/*!
 * 命令解析器
 *
 * 两种确定性语法：
 * - `@domain:action args...`  领域命令
 * - `/action args...`         系统命令
 *
 * `@domain 自由文本` 没有动作，交给自然语言解析器处理。
 */

use super::types::Command;

/// Where a line of user input should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Deterministic command, execute directly.
    Command(Command),
    /// `@domain <free text>`: resolve the text within the domain.
    DomainText { domain: String, text: String },
    /// Not a command; plain conversation.
    Chat(String),
}

pub struct CommandParser;

impl CommandParser {
    /// Parses one line of input. Returns `None` for anything that is not a command.
    pub fn parse(text: &str) -> Option<Command> {
        Self::split(text).map(|(command, _)| command)
    }

    /// Like [`parse`](Self::parse) but keeps the raw free text of bare `@domain` input.
    pub fn route(text: &str) -> Route {
        let trimmed = text.trim();
        match Self::split(trimmed) {
            Some((command, rest)) if command.is_bare_domain() && !rest.is_empty() => {
                Route::DomainText {
                    domain: command.domain,
                    text: rest.to_string(),
                }
            }
            Some((command, _)) => Route::Command(command),
            None => Route::Chat(trimmed.to_string()),
        }
    }

    /// Splits on whitespace runs; single- or double-quoted substrings form one argument.
    ///
    /// Quotes are stripped, nothing is unescaped. An unterminated quote runs to the
    /// end of input. Single quotes only open at the start of a token so words such
    /// as `don't` stay intact.
    pub fn tokenize(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_token = false;
        let mut quote: Option<char> = None;

        for ch in text.chars() {
            if let Some(q) = quote {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
                continue;
            }

            match ch {
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                '"' => {
                    quote = Some('"');
                    in_token = true;
                }
                '\'' if !in_token => {
                    quote = Some('\'');
                    in_token = true;
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            }
        }

        if in_token {
            tokens.push(current);
        }
        tokens
    }

    /// Returns the command plus the raw remainder after the head token.
    fn split(text: &str) -> Option<(Command, &str)> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('@') {
            Self::split_at(rest)
        } else if let Some(rest) = text.strip_prefix('/') {
            Self::split_slash(rest)
        } else {
            None
        }
    }

    fn split_at(rest: &str) -> Option<(Command, &str)> {
        let (head, remainder) = Self::head_token(rest);

        // 分隔符只在未加引号的首个 token 中查找
        let (domain, action) = match head.split_once(':') {
            Some((domain, action)) => (domain, action),
            None => (head, ""),
        };
        if !is_identifier(domain) || !(action.is_empty() || is_identifier(action)) {
            return None;
        }

        let command = Command::at(domain, action, Self::tokenize(remainder));
        Some((command, remainder.trim()))
    }

    fn split_slash(rest: &str) -> Option<(Command, &str)> {
        let (head, remainder) = Self::head_token(rest);
        if !is_identifier(head) {
            return None;
        }
        let command = Command::slash(head, Self::tokenize(remainder));
        Some((command, remainder.trim()))
    }

    /// Leading token up to the first whitespace or quote.
    fn head_token(text: &str) -> (&str, &str) {
        let end = text
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(text.len());
        text.split_at(end)
    }
}

/// Domain and action names: letters, digits, `-`, `_`, `.`, `?`.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '?'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::types::{CommandPrefix, SYSTEM_DOMAIN};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slash_command() {
        let cmd = CommandParser::parse("/help").unwrap();
        assert_eq!(cmd.prefix, CommandPrefix::Slash);
        assert_eq!(cmd.domain, SYSTEM_DOMAIN);
        assert_eq!(cmd.action, "help");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_domain_command_with_quoted_message() {
        let cmd = CommandParser::parse("@git:commit -m \"msg\"").unwrap();
        assert_eq!(cmd, Command::at("git", "commit", args(&["-m", "msg"])));
    }

    #[test]
    fn test_quoted_argument_is_single_token() {
        let cmd = CommandParser::parse("@pocket:grep \"a b\" c").unwrap();
        assert_eq!(cmd.args, args(&["a b", "c"]));
    }

    #[test]
    fn test_single_quotes() {
        let cmd = CommandParser::parse("/echo 'hello world' don't").unwrap();
        assert_eq!(cmd.args, args(&["hello world", "don't"]));
    }

    #[test]
    fn test_colon_inside_quotes_is_not_separator() {
        let cmd = CommandParser::parse("@pocket \"a:b\" rest").unwrap();
        assert_eq!(cmd.domain, "pocket");
        assert_eq!(cmd.action, "");
        assert_eq!(cmd.args, args(&["a:b", "rest"]));

        let cmd = CommandParser::parse("@pocket:grep \"key: value\"").unwrap();
        assert_eq!(cmd.action, "grep");
        assert_eq!(cmd.args, args(&["key: value"]));
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let cmd = CommandParser::parse("  /log    -n\t 5  ").unwrap();
        assert_eq!(cmd.args, args(&["-n", "5"]));
    }

    #[test]
    fn test_flags_are_preserved_verbatim() {
        let cmd = CommandParser::parse("@pocket:ls docs --depth=3").unwrap();
        assert_eq!(cmd.args, args(&["docs", "--depth=3"]));
    }

    #[test]
    fn test_bare_domain() {
        let cmd = CommandParser::parse("@pocket docs 폴더의 파일 목록 보여줘").unwrap();
        assert_eq!(cmd.domain, "pocket");
        assert!(cmd.is_bare_domain());
        assert_eq!(cmd.args, args(&["docs", "폴더의", "파일", "목록", "보여줘"]));
    }

    #[test]
    fn test_trailing_colon_is_bare_domain() {
        let cmd = CommandParser::parse("@git:").unwrap();
        assert!(cmd.is_bare_domain());
    }

    #[test]
    fn test_non_commands() {
        for input in [
            "",
            "   ",
            "hello there",
            "@",
            "@:status",
            "@ git:status",
            "/",
            "/ help",
            "//comment",
            "/usr/bin/env",
            "email me@example.com",
        ] {
            assert!(CommandParser::parse(input).is_none(), "{input:?}");
        }
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let cmd = CommandParser::parse("@git:commit -m \"half open").unwrap();
        assert_eq!(cmd.args, args(&["-m", "half open"]));
    }

    #[test]
    fn test_empty_quoted_argument() {
        let cmd = CommandParser::parse("/echo \"\" x").unwrap();
        assert_eq!(cmd.args, args(&["", "x"]));
    }

    #[test]
    fn test_parse_is_total() {
        let samples = [
            "@\"", "/'", "@a:b:c", "@@x", "/\u{0}", "@한글:목록", "\"@git:status\"", "@x:\"y\"",
            ":::", "@a: b", "/a\"b c\"", "@git:status\n--short",
        ];
        for s in samples {
            if let Some(cmd) = CommandParser::parse(s) {
                match cmd.prefix {
                    CommandPrefix::At => assert!(!cmd.domain.is_empty(), "{s:?}"),
                    CommandPrefix::Slash => assert_eq!(cmd.domain, SYSTEM_DOMAIN, "{s:?}"),
                }
            }
        }
    }

    #[test]
    fn test_route() {
        assert_eq!(
            CommandParser::route("@pocket  docs 폴더 \"보고서 초안\" "),
            Route::DomainText {
                domain: "pocket".into(),
                text: "docs 폴더 \"보고서 초안\"".into(),
            }
        );
        assert!(matches!(
            CommandParser::route("@git:status"),
            Route::Command(cmd) if cmd.action == "status"
        ));
        assert!(matches!(
            CommandParser::route("@pocket"),
            Route::Command(cmd) if cmd.is_bare_domain()
        ));
        assert_eq!(
            CommandParser::route("  just chatting "),
            Route::Chat("just chatting".into())
        );
    }
}
