/*!
 * swdp 领域：构建门户
 *
 * 触发构建、查询状态、查看日志、取消构建。门户通过 `SwdpBackend` 注入。
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::app_bail;
use crate::command::definition::{CommandDefinition, CommandHandler, HandlerOutput, Validatable};
use crate::command::types::ExecutionResult;
use crate::plugin::CommandPlugin;
use crate::resolver::{DomainDescriptor, PatternExtractor};
use crate::utils::error::{app_error, AppResult};

pub const SWDP_DOMAIN: &str = "swdp";
pub const SWDP_PLUGIN_ID: &str = "builtin.swdp";

pub const DEFAULT_BRANCH: &str = "main";
const RECENT_BUILDS: usize = 5;
const FIRST_BUILD_NUMBER: u64 = 1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl BuildStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BuildStatus::Succeeded | BuildStatus::Failed | BuildStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Queued => "queued",
            BuildStatus::Running => "running",
            BuildStatus::Succeeded => "succeeded",
            BuildStatus::Failed => "failed",
            BuildStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: String,
    pub project: String,
    pub branch: String,
    pub status: BuildStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuildRecord {
    pub fn summary(&self) -> String {
        format!(
            "{} {}@{} {}",
            self.id,
            self.project,
            self.branch,
            self.status.as_str()
        )
    }
}

#[async_trait]
pub trait SwdpBackend: Send + Sync {
    async fn start_build(&self, project: &str, branch: &str) -> AppResult<BuildRecord>;

    async fn build(&self, id: &str) -> AppResult<BuildRecord>;

    /// 最新的在前
    async fn recent_builds(&self, limit: usize) -> AppResult<Vec<BuildRecord>>;

    async fn logs(&self, id: &str) -> AppResult<Vec<String>>;

    async fn cancel(&self, id: &str) -> AppResult<BuildRecord>;
}

struct BuildSlot {
    record: BuildRecord,
    logs: Vec<String>,
}

/// 内存构建门户，构建停留在 queued，直到调用 `advance`
pub struct MemorySwdpBackend {
    builds: RwLock<Vec<BuildSlot>>,
    next_number: AtomicU64,
}

impl Default for MemorySwdpBackend {
    fn default() -> Self {
        Self {
            builds: RwLock::new(Vec::new()),
            next_number: AtomicU64::new(FIRST_BUILD_NUMBER),
        }
    }
}

impl MemorySwdpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进构建状态并追加一行日志
    pub fn advance(&self, id: &str, status: BuildStatus, log_line: &str) -> AppResult<()> {
        let mut builds = self.builds.write();
        let slot = find_slot(&mut builds, id)?;
        slot.record.status = status;
        slot.record.updated_at = Utc::now();
        slot.logs.push(log_line.to_string());
        Ok(())
    }
}

fn find_slot<'a>(builds: &'a mut [BuildSlot], id: &str) -> AppResult<&'a mut BuildSlot> {
    builds
        .iter_mut()
        .find(|s| s.record.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| app_error(format!("no such build: {}", id)))
}

#[async_trait]
impl SwdpBackend for MemorySwdpBackend {
    async fn start_build(&self, project: &str, branch: &str) -> AppResult<BuildRecord> {
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let record = BuildRecord {
            id: format!("B{}", number),
            project: project.to_string(),
            branch: branch.to_string(),
            status: BuildStatus::Queued,
            created_at: now,
            updated_at: now,
        };
        info!("排队构建 {}", record.summary());

        self.builds.write().push(BuildSlot {
            record: record.clone(),
            logs: vec![format!("queued {}@{}", project, branch)],
        });
        Ok(record)
    }

    async fn build(&self, id: &str) -> AppResult<BuildRecord> {
        let mut builds = self.builds.write();
        Ok(find_slot(&mut builds, id)?.record.clone())
    }

    async fn recent_builds(&self, limit: usize) -> AppResult<Vec<BuildRecord>> {
        Ok(self
            .builds
            .read()
            .iter()
            .rev()
            .take(limit)
            .map(|s| s.record.clone())
            .collect())
    }

    async fn logs(&self, id: &str) -> AppResult<Vec<String>> {
        let mut builds = self.builds.write();
        Ok(find_slot(&mut builds, id)?.logs.clone())
    }

    async fn cancel(&self, id: &str) -> AppResult<BuildRecord> {
        let mut builds = self.builds.write();
        let slot = find_slot(&mut builds, id)?;
        if slot.record.status.is_finished() {
            app_bail!(
                "build {} already {}",
                slot.record.id,
                slot.record.status.as_str()
            );
        }
        slot.record.status = BuildStatus::Cancelled;
        slot.record.updated_at = Utc::now();
        slot.logs.push("cancelled by user".to_string());
        Ok(slot.record.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwdpRequest {
    Build { project: String, branch: String },
    Status { id: Option<String> },
    Logs { id: String },
    Cancel { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwdpAction {
    Build,
    Status,
    Logs,
    Cancel,
}

impl SwdpAction {
    pub fn id(&self) -> &'static str {
        match self {
            SwdpAction::Build => "build",
            SwdpAction::Status => "status",
            SwdpAction::Logs => "logs",
            SwdpAction::Cancel => "cancel",
        }
    }

    pub fn parse(&self, args: &[String]) -> Result<SwdpRequest, String> {
        match self {
            SwdpAction::Build => {
                let mut project: Option<String> = None;
                let mut branch = DEFAULT_BRANCH.to_string();
                for arg in args {
                    if let Some(b) = arg.strip_prefix("--branch=") {
                        if b.is_empty() {
                            return Err("--branch must not be empty".to_string());
                        }
                        branch = b.to_string();
                    } else if arg.starts_with("--") {
                        return Err(format!("unsupported option `{}`", arg));
                    } else if project.is_some() {
                        return Err("expected exactly one project".to_string());
                    } else {
                        project = Some(arg.clone());
                    }
                }
                let project = project.ok_or("a project name is required")?;
                Ok(SwdpRequest::Build { project, branch })
            }
            SwdpAction::Status => match args {
                [] => Ok(SwdpRequest::Status { id: None }),
                [id] => Ok(SwdpRequest::Status { id: Some(id.clone()) }),
                _ => Err("usage: @swdp:status [id]".to_string()),
            },
            SwdpAction::Logs | SwdpAction::Cancel => {
                let [id] = args else {
                    return Err(format!("expected exactly one build id, got {}", args.len()));
                };
                Ok(if *self == SwdpAction::Logs {
                    SwdpRequest::Logs { id: id.clone() }
                } else {
                    SwdpRequest::Cancel { id: id.clone() }
                })
            }
        }
    }
}

struct SwdpHandler {
    action: SwdpAction,
    backend: Arc<dyn SwdpBackend>,
}

impl Validatable for SwdpHandler {
    fn validate(&self, args: &[String]) -> Result<(), String> {
        self.action.parse(args).map(|_| ())
    }
}

#[async_trait]
impl CommandHandler for SwdpHandler {
    async fn execute(&self, args: &[String]) -> AppResult<HandlerOutput> {
        let record_output = |record: BuildRecord| -> HandlerOutput {
            ExecutionResult::with_data(record.summary(), json!(record)).into()
        };

        match self.action.parse(args).map_err(app_error)? {
            SwdpRequest::Build { project, branch } => {
                let record = self.backend.start_build(&project, &branch).await?;
                Ok(ExecutionResult::with_data(
                    format!("Started build {} for {}@{}", record.id, project, branch),
                    json!(record),
                )
                .into())
            }
            SwdpRequest::Status { id: Some(id) } => Ok(record_output(self.backend.build(&id).await?)),
            SwdpRequest::Status { id: None } => {
                let builds = self.backend.recent_builds(RECENT_BUILDS).await?;
                if builds.is_empty() {
                    return Ok(HandlerOutput::Text("No builds yet".to_string()));
                }
                let content = builds
                    .iter()
                    .map(BuildRecord::summary)
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ExecutionResult::with_data(content, json!(builds)).into())
            }
            SwdpRequest::Logs { id } => {
                let lines = self.backend.logs(&id).await?;
                Ok(HandlerOutput::Text(lines.join("\n")))
            }
            SwdpRequest::Cancel { id } => Ok(record_output(self.backend.cancel(&id).await?)),
        }
    }

    fn validator(&self) -> Option<&dyn Validatable> {
        Some(self)
    }
}

pub struct SwdpPlugin {
    backend: Arc<dyn SwdpBackend>,
}

impl SwdpPlugin {
    pub fn new(backend: Arc<dyn SwdpBackend>) -> Self {
        Self { backend }
    }

    fn definition(&self, action: SwdpAction) -> CommandDefinition {
        CommandDefinition::new(
            SWDP_DOMAIN,
            action.id(),
            SwdpHandler {
                action,
                backend: Arc::clone(&self.backend),
            },
        )
        .tags(["build"])
    }
}

impl CommandPlugin for SwdpPlugin {
    fn id(&self) -> &str {
        SWDP_PLUGIN_ID
    }

    fn domain(&self) -> &str {
        SWDP_DOMAIN
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        vec![
            self.definition(SwdpAction::Build)
                .syntax("@swdp:build <project> [--branch=B]")
                .description("Queue a build")
                .examples(["@swdp:build api-server --branch=develop"]),
            self.definition(SwdpAction::Status)
                .syntax("@swdp:status [id]")
                .description("Show one build or the most recent builds"),
            self.definition(SwdpAction::Logs)
                .syntax("@swdp:logs <id>")
                .description("Show build logs")
                .examples(["@swdp:logs B1001"]),
            self.definition(SwdpAction::Cancel)
                .syntax("@swdp:cancel <id>")
                .description("Cancel a queued or running build")
                .requires_confirmation(),
        ]
    }

    fn descriptor(&self) -> Option<DomainDescriptor> {
        let build_id = r"(?i)\b(b\d{3,})";

        Some(
            DomainDescriptor::new(SWDP_DOMAIN, "status")
                .triggers("status", ["status", "progress", "빌드 상태", "상태", "진행"])
                .triggers("build", ["build", "start a build", "빌드", "빌드해"])
                .triggers("logs", ["logs", "log", "로그"])
                .triggers("cancel", ["cancel", "stop", "취소", "중지"])
                .extractor(
                    PatternExtractor::new()
                        .without_quoted()
                        .rule(&["status", "logs", "cancel"], build_id, "$1")
                        .rule(&["build"], r"(\S+?)\s*프로젝트", "$1")
                        .rule(&["build"], r"(?i)\bproject\s+([A-Za-z0-9_.-]+)", "$1")
                        .rule(&["build"], r"([A-Za-z0-9_./-]+)\s*브랜치", "--branch=$1")
                        .rule(&["build"], r"(?i)\bbranch\s+([A-Za-z0-9_./-]+)", "--branch=$1"),
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

    #[tokio::test]
    async fn test_build_lifecycle() {
        let backend = MemorySwdpBackend::new();
        let first = backend.start_build("api", "main").await.unwrap();
        let second = backend.start_build("web", "develop").await.unwrap();
        assert_eq!(first.id, "B1001");
        assert_eq!(second.id, "B1002");

        let recent = backend.recent_builds(5).await.unwrap();
        assert_eq!(recent[0].id, "B1002");

        backend.advance("b1001", BuildStatus::Running, "compiling").unwrap();
        assert_eq!(backend.build("B1001").await.unwrap().status, BuildStatus::Running);

        let cancelled = backend.cancel("B1001").await.unwrap();
        assert_eq!(cancelled.status, BuildStatus::Cancelled);
        assert!(backend.cancel("B1001").await.is_err());
        assert_eq!(
            backend.logs("B1001").await.unwrap(),
            vec!["queued api@main", "compiling", "cancelled by user"]
        );
        assert!(backend.build("B9999").await.is_err());
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            SwdpAction::Build.parse(&s(&["api", "--branch=dev"])).unwrap(),
            SwdpRequest::Build { project: "api".into(), branch: "dev".into() }
        );
        assert_eq!(
            SwdpAction::Build.parse(&s(&["api"])).unwrap(),
            SwdpRequest::Build { project: "api".into(), branch: DEFAULT_BRANCH.into() }
        );
        assert!(SwdpAction::Build.parse(&[]).is_err());
        assert!(SwdpAction::Build.parse(&s(&["api", "--branch="])).is_err());
        assert_eq!(
            SwdpAction::Status.parse(&[]).unwrap(),
            SwdpRequest::Status { id: None }
        );
        assert!(SwdpAction::Logs.parse(&[]).is_err());
        assert!(SwdpAction::Cancel.parse(&s(&["a", "b"])).is_err());
    }

    #[tokio::test]
    async fn test_status_handler_lists_recent_builds() {
        let backend = Arc::new(MemorySwdpBackend::new());
        let handler = SwdpHandler {
            action: SwdpAction::Status,
            backend: backend.clone(),
        };
        let output = handler.execute(&[]).await.unwrap();
        assert!(matches!(output, HandlerOutput::Text(t) if t == "No builds yet"));

        backend.start_build("api", "main").await.unwrap();
        let HandlerOutput::Result(result) = handler.execute(&[]).await.unwrap() else {
            panic!("expected structured result");
        };
        assert_eq!(result.content, "B1001 api@main queued");
    }

    #[test]
    fn test_descriptor_extracts_ids_projects_and_branches() {
        let plugin = SwdpPlugin::new(Arc::new(MemorySwdpBackend::new()));
        let descriptor = plugin.descriptor().unwrap();
        assert_eq!(descriptor.extract_args("logs", "B1001의 로그 보여줘"), vec!["B1001"]);
        assert_eq!(
            descriptor.extract_args("build", "develop 브랜치로 api 프로젝트 빌드해줘"),
            vec!["api", "--branch=develop"]
        );
        assert_eq!(
            descriptor.extract_args("build", "build project web on branch release/1.2"),
            vec!["web", "--branch=release/1.2"]
        );
    }
}
