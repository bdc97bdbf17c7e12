/*!
 * pocket 领域：对象存储浏览
 *
 * 对象以 `a/b/c.txt` 形式的键存放，目录由键前缀隐式构成。
 * 存储后端通过 `PocketBackend` trait 注入，内置内存实现。
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_bail;
use crate::command::definition::{CommandDefinition, CommandHandler, HandlerOutput, Validatable};
use crate::command::types::ExecutionResult;
use crate::plugin::CommandPlugin;
use crate::resolver::{DomainDescriptor, PatternExtractor};
use crate::utils::error::{app_error, AppResult};

pub const POCKET_DOMAIN: &str = "pocket";
pub const POCKET_PLUGIN_ID: &str = "builtin.pocket";

const DEFAULT_LIST_DEPTH: usize = 1;
const MAX_GREP_MATCHES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PocketEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[async_trait]
pub trait PocketBackend: Send + Sync {
    /// 列出 `path` 下 `depth` 层以内的条目；`path` 为文件时只返回它自己
    async fn list(&self, path: &str, depth: usize) -> AppResult<Vec<PocketEntry>>;

    async fn read(&self, path: &str) -> AppResult<String>;

    async fn stat(&self, path: &str) -> AppResult<PocketEntry>;

    /// 删除对象或整个目录，返回删除的对象数
    async fn remove(&self, path: &str) -> AppResult<usize>;
}

/// 去掉首尾的 `/`，`.` 视为根
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn dir_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path)
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    content: String,
    modified: DateTime<Utc>,
}

impl StoredObject {
    fn entry(&self, path: &str) -> PocketEntry {
        PocketEntry {
            path: path.to_string(),
            is_dir: false,
            size: self.content.len() as u64,
            modified: self.modified,
        }
    }
}

/// 内存对象存储
#[derive(Default)]
pub struct MemoryPocketBackend {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryPocketBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, path: &str, content: impl Into<String>) -> Self {
        self.put(path, content);
        self
    }

    pub fn put(&self, path: &str, content: impl Into<String>) {
        self.objects.write().insert(
            normalize_path(path),
            StoredObject {
                content: content.into(),
                modified: Utc::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl PocketBackend for MemoryPocketBackend {
    async fn list(&self, path: &str, depth: usize) -> AppResult<Vec<PocketEntry>> {
        let path = normalize_path(path);
        let objects = self.objects.read();

        if let Some(object) = objects.get(&path) {
            return Ok(vec![object.entry(&path)]);
        }

        let prefix = dir_prefix(&path);
        let mut entries: BTreeMap<String, PocketEntry> = BTreeMap::new();

        for (key, object) in objects.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            let segments: Vec<&str> = rest.split('/').collect();
            if segments.len() <= depth {
                entries.insert(key.clone(), object.entry(key));
                continue;
            }

            let dir = format!("{}{}/", prefix, segments[..depth].join("/"));
            let entry = entries.entry(dir.clone()).or_insert_with(|| PocketEntry {
                path: dir,
                is_dir: true,
                size: 0,
                modified: object.modified,
            });
            entry.size += object.content.len() as u64;
            entry.modified = entry.modified.max(object.modified);
        }

        if entries.is_empty() && !path.is_empty() {
            app_bail!("no such path: {}", path);
        }
        Ok(entries.into_values().collect())
    }

    async fn read(&self, path: &str) -> AppResult<String> {
        let path = normalize_path(path);
        let objects = self.objects.read();
        match objects.get(&path) {
            Some(object) => Ok(object.content.clone()),
            None if objects.keys().any(|k| k.starts_with(&dir_prefix(&path))) => {
                app_bail!("{} is a directory", path)
            }
            None => app_bail!("no such object: {}", path),
        }
    }

    async fn stat(&self, path: &str) -> AppResult<PocketEntry> {
        let path = normalize_path(path);
        let objects = self.objects.read();
        if let Some(object) = objects.get(&path) {
            return Ok(object.entry(&path));
        }

        let prefix = dir_prefix(&path);
        let mut dir: Option<PocketEntry> = None;
        for (_, object) in objects.iter().filter(|(k, _)| k.starts_with(&prefix)) {
            let entry = dir.get_or_insert_with(|| PocketEntry {
                path: if prefix.is_empty() { "/".to_string() } else { prefix.clone() },
                is_dir: true,
                size: 0,
                modified: object.modified,
            });
            entry.size += object.content.len() as u64;
            entry.modified = entry.modified.max(object.modified);
        }
        dir.ok_or_else(|| app_error(format!("no such path: {}", path)))
    }

    async fn remove(&self, path: &str) -> AppResult<usize> {
        let path = normalize_path(path);
        if path.is_empty() {
            app_bail!("refusing to remove the storage root");
        }
        let mut objects = self.objects.write();
        if objects.remove(&path).is_some() {
            return Ok(1);
        }

        let prefix = dir_prefix(&path);
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - objects.len();
        if removed == 0 {
            app_bail!("no such path: {}", path);
        }
        Ok(removed)
    }
}

/// 解析后的 pocket 请求
#[derive(Debug, Clone, PartialEq)]
pub enum PocketRequest {
    List { path: String, depth: usize },
    Cat { path: String },
    Grep { pattern: String, path: String },
    Info { path: String },
    Remove { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocketAction {
    Ls,
    Cat,
    Grep,
    Info,
    Rm,
}

impl PocketAction {
    pub fn id(&self) -> &'static str {
        match self {
            PocketAction::Ls => "ls",
            PocketAction::Cat => "cat",
            PocketAction::Grep => "grep",
            PocketAction::Info => "info",
            PocketAction::Rm => "rm",
        }
    }

    pub fn parse(&self, args: &[String]) -> Result<PocketRequest, String> {
        match self {
            PocketAction::Ls => {
                let mut path: Option<String> = None;
                let mut depth = DEFAULT_LIST_DEPTH;
                for arg in args {
                    if let Some(n) = arg.strip_prefix("--depth=") {
                        depth = n
                            .parse()
                            .ok()
                            .filter(|d| *d > 0)
                            .ok_or_else(|| format!("invalid --depth value `{}`", n))?;
                    } else if arg.starts_with("--") {
                        return Err(format!("unsupported option `{}`", arg));
                    } else if path.is_some() {
                        return Err("expected at most one path".to_string());
                    } else {
                        path = Some(arg.clone());
                    }
                }
                Ok(PocketRequest::List {
                    path: path.unwrap_or_default(),
                    depth,
                })
            }
            PocketAction::Grep => match args {
                [pattern] | [pattern, _] => {
                    Regex::new(pattern).map_err(|e| format!("invalid pattern: {}", e))?;
                    Ok(PocketRequest::Grep {
                        pattern: pattern.clone(),
                        path: args.get(1).cloned().unwrap_or_default(),
                    })
                }
                _ => Err("usage: @pocket:grep <pattern> [path]".to_string()),
            },
            PocketAction::Cat | PocketAction::Info | PocketAction::Rm => {
                let [path] = args else {
                    return Err(format!("expected exactly one path, got {}", args.len()));
                };
                let path = path.clone();
                Ok(match self {
                    PocketAction::Cat => PocketRequest::Cat { path },
                    PocketAction::Info => PocketRequest::Info { path },
                    _ => PocketRequest::Remove { path },
                })
            }
        }
    }
}

fn render_entries(entries: &[PocketEntry]) -> String {
    if entries.is_empty() {
        return "(empty)".to_string();
    }
    entries
        .iter()
        .map(|e| {
            if e.is_dir {
                e.path.clone()
            } else {
                format!("{}  ({} B)", e.path, e.size)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct PocketHandler {
    action: PocketAction,
    backend: Arc<dyn PocketBackend>,
}

impl PocketHandler {
    async fn grep(&self, pattern: &str, path: &str) -> AppResult<HandlerOutput> {
        let regex = Regex::new(pattern).map_err(|e| app_error(e.to_string()))?;
        let files = self.backend.list(path, usize::MAX).await?;

        let mut matches = Vec::new();
        'files: for file in files.iter().filter(|f| !f.is_dir) {
            let content = self.backend.read(&file.path).await?;
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(json!({ "path": file.path, "line": idx + 1, "text": line }));
                    if matches.len() >= MAX_GREP_MATCHES {
                        break 'files;
                    }
                }
            }
        }

        if matches.is_empty() {
            return Ok(HandlerOutput::Text(format!("No matches for `{}`", pattern)));
        }
        let content = matches
            .iter()
            .map(|m| {
                format!(
                    "{}:{}: {}",
                    m["path"].as_str().unwrap_or_default(),
                    m["line"],
                    m["text"].as_str().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ExecutionResult::with_data(content, json!(matches)).into())
    }
}

impl Validatable for PocketHandler {
    fn validate(&self, args: &[String]) -> Result<(), String> {
        self.action.parse(args).map(|_| ())
    }
}

#[async_trait]
impl CommandHandler for PocketHandler {
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput> {
        match self.action.parse(args).map_err(app_error)? {
            PocketRequest::List { path, depth } => {
                let entries = self.backend.list(&path, depth).await?;
                Ok(ExecutionResult::with_data(render_entries(&entries), json!(entries)).into())
            }
            PocketRequest::Cat { path } => Ok(HandlerOutput::Text(self.backend.read(&path).await?)),
            PocketRequest::Grep { pattern, path } => self.grep(&pattern, &path).await,
            PocketRequest::Info { path } => {
                let entry = self.backend.stat(&path).await?;
                let kind = if entry.is_dir { "directory" } else { "object" };
                Ok(ExecutionResult::with_data(
                    format!(
                        "{} ({}, {} B, modified {})",
                        entry.path,
                        kind,
                        entry.size,
                        entry.modified.to_rfc3339()
                    ),
                    json!(entry),
                )
                .into())
            }
            PocketRequest::Remove { path } => {
                let removed = self.backend.remove(&path).await?;
                Ok(HandlerOutput::Text(format!(
                    "Removed {} object(s) under `{}`",
                    removed,
                    normalize_path(&path)
                )))
            }
        }
    }

    fn validator(&self) -> Option<&dyn Validatable> {
        Some(self)
    }
}

pub struct PocketPlugin {
    backend: Arc<dyn PocketBackend>,
}

impl PocketPlugin {
    pub fn new(backend: Arc<dyn PocketBackend>) -> Self {
        Self { backend }
    }

    fn definition(&self, action: PocketAction) -> CommandDefinition {
        CommandDefinition::new(
            POCKET_DOMAIN,
            action.id(),
            PocketHandler {
                action,
                backend: Arc::clone(&self.backend),
            },
        )
        .tags(["storage"])
    }
}

impl CommandPlugin for PocketPlugin {
    fn id(&self) -> &str {
        POCKET_PLUGIN_ID
    }

    fn domain(&self) -> &str {
        POCKET_DOMAIN
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        vec![
            self.definition(PocketAction::Ls)
                .syntax("@pocket:ls [path] [--depth=N]")
                .description("List objects and folders")
                .examples(["@pocket:ls docs/", "@pocket:ls --depth=2"]),
            self.definition(PocketAction::Cat)
                .syntax("@pocket:cat <path>")
                .description("Print an object")
                .examples(["@pocket:cat docs/readme.md"]),
            self.definition(PocketAction::Grep)
                .syntax("@pocket:grep <pattern> [path]")
                .description("Search object contents with a regular expression")
                .examples(["@pocket:grep \"TODO\" src/"])
                .aliases(["search"]),
            self.definition(PocketAction::Info)
                .syntax("@pocket:info <path>")
                .description("Show size and modification time"),
            self.definition(PocketAction::Rm)
                .syntax("@pocket:rm <path>")
                .description("Delete an object or folder")
                .requires_confirmation(),
        ]
    }

    fn descriptor(&self) -> Option<DomainDescriptor> {
        let folder = r"(\S+?)\s*폴더";
        let file = r"([A-Za-z0-9_./-]+\.[A-Za-z0-9]+)";

        Some(
            DomainDescriptor::new(POCKET_DOMAIN, "ls")
                .triggers("ls", ["list", "list files", "files", "파일 목록", "목록"])
                .triggers("cat", ["show", "read", "open", "내용", "열어"])
                .triggers("grep", ["search", "find", "찾아", "검색"])
                .triggers("info", ["info", "details", "size", "정보", "크기"])
                .triggers("rm", ["delete", "remove", "삭제", "지워"])
                .extractor(
                    PatternExtractor::new()
                        .rule(&["ls", "grep", "info", "rm"], folder, "$1/")
                        .rule(&["ls"], r"(?i)(?:깊이|depth)\s*(\d+)", "--depth=$1")
                        .rule(&["cat", "grep", "info", "rm"], file, "$1"),
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

    fn backend() -> MemoryPocketBackend {
        MemoryPocketBackend::new()
            .with_object("readme.md", "# pocket\n")
            .with_object("docs/guide.md", "intro\nTODO: write more\n")
            .with_object("docs/api/index.md", "api TODO\n")
            .with_object("src/main.rs", "fn main() {}\n")
    }

    fn paths(entries: &[PocketEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/docs/"), "docs");
        assert_eq!(normalize_path("."), "");
        assert_eq!(normalize_path(""), "");
    }

    #[tokio::test]
    async fn test_list_depths() {
        let backend = backend();
        let root = backend.list("", 1).await.unwrap();
        assert_eq!(paths(&root), vec!["docs/", "readme.md", "src/"]);

        let docs = backend.list("docs/", 1).await.unwrap();
        assert_eq!(paths(&docs), vec!["docs/api/", "docs/guide.md"]);
        assert_eq!(docs[0].size, "api TODO\n".len() as u64);

        let deep = backend.list("docs", 2).await.unwrap();
        assert_eq!(paths(&deep), vec!["docs/api/index.md", "docs/guide.md"]);

        assert!(backend.list("missing", 1).await.is_err());
        assert!(MemoryPocketBackend::new().list("", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_stat_remove() {
        let backend = backend();
        assert_eq!(backend.read("/readme.md").await.unwrap(), "# pocket\n");
        assert!(backend.read("docs").await.unwrap_err().to_string().contains("directory"));

        let info = backend.stat("docs").await.unwrap();
        assert!(info.is_dir);
        assert_eq!(info.path, "docs/");

        assert_eq!(backend.remove("docs").await.unwrap(), 2);
        assert_eq!(backend.len(), 2);
        assert!(backend.remove("docs").await.is_err());
        assert!(backend.remove("/").await.is_err());
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            PocketAction::Ls.parse(&s(&["docs/", "--depth=3"])).unwrap(),
            PocketRequest::List { path: "docs/".into(), depth: 3 }
        );
        assert_eq!(
            PocketAction::Ls.parse(&[]).unwrap(),
            PocketRequest::List { path: String::new(), depth: 1 }
        );
        assert!(PocketAction::Ls.parse(&s(&["--depth=0"])).is_err());
        assert!(PocketAction::Ls.parse(&s(&["a", "b"])).is_err());
        assert!(PocketAction::Cat.parse(&[]).is_err());
        assert!(PocketAction::Grep.parse(&s(&["("])).is_err());
        assert_eq!(
            PocketAction::Rm.parse(&s(&["x"])).unwrap(),
            PocketRequest::Remove { path: "x".into() }
        );
    }

    #[tokio::test]
    async fn test_grep_handler() {
        let handler = PocketHandler {
            action: PocketAction::Grep,
            backend: Arc::new(backend()),
        };
        let output = handler.execute(&s(&["TODO", "docs"])).await.unwrap();
        let HandlerOutput::Result(result) = output else {
            panic!("expected structured result");
        };
        assert_eq!(
            result.content,
            "docs/api/index.md:1: api TODO\ndocs/guide.md:2: TODO: write more"
        );

        let output = handler.execute(&s(&["nothing"])).await.unwrap();
        assert!(matches!(output, HandlerOutput::Text(t) if t.contains("No matches")));
    }

    #[test]
    fn test_descriptor_extracts_folder_and_depth() {
        let plugin = PocketPlugin::new(Arc::new(MemoryPocketBackend::new()));
        let descriptor = plugin.descriptor().unwrap();
        assert_eq!(
            descriptor.extract_args("ls", "docs 폴더의 파일 목록 보여줘"),
            vec!["docs/"]
        );
        assert_eq!(
            descriptor.extract_args("ls", "src 폴더 깊이 3까지 목록"),
            vec!["src/", "--depth=3"]
        );
        assert_eq!(
            descriptor.extract_args("grep", "\"TODO\" 를 docs 폴더에서 찾아"),
            vec!["TODO", "docs/"]
        );
        assert_eq!(descriptor.extract_args("cat", "readme.md 내용"), vec!["readme.md"]);
    }

    #[test]
    fn test_rm_requires_confirmation() {
        let plugin = PocketPlugin::new(Arc::new(MemoryPocketBackend::new()));
        let commands = plugin.commands();
        let rm = commands.iter().find(|c| c.id == "rm").unwrap();
        assert!(rm.requires_confirmation);
        assert!(commands.iter().filter(|c| c.id != "rm").all(|c| !c.requires_confirmation));
    }
}
