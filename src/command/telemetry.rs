/*!
 * 执行遥测
 *
 * 每次执行都累计到按命令名分组的统计中，并广播一条 ExecutionEvent。
 * 未知命令统一计入 [`UNKNOWN_COMMAND_KEY`]，避免用户输入的拼写错误变成新的统计项。
 * 没有订阅者时事件直接丢弃。
 */

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::types::{ErrorKind, ExecutionResult};

pub const UNKNOWN_COMMAND_KEY: &str = "<unknown>";

/// 命令执行统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecutionStats {
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_execution_time_ms: u64,
    pub avg_execution_time_ms: u64,
    pub last_called_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 单次执行的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub id: Uuid,
    /// `@domain:action` 或 `/action`
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub duration_ms: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub struct ExecutionTelemetry {
    stats: DashMap<String, CommandExecutionStats>,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl ExecutionTelemetry {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(512);
        Self {
            stats: DashMap::new(),
            sender,
        }
    }

    pub fn record(&self, command: &str, result: &ExecutionResult) {
        let success = !result.is_error();
        let error_kind = result.error_kind;
        let duration_ms = result.execution_time_ms.unwrap_or(0);
        let now = chrono::Utc::now();

        let key = match error_kind {
            Some(ErrorKind::UnknownCommand) => UNKNOWN_COMMAND_KEY,
            _ => command,
        };
        {
            let mut s = self.stats.entry(key.to_string()).or_default();
            s.total_calls += 1;
            if success {
                s.success_count += 1;
            } else {
                s.failure_count += 1;
            }
            s.total_execution_time_ms += duration_ms;
            s.avg_execution_time_ms = s.total_execution_time_ms / s.total_calls.max(1);
            s.last_called_at = Some(now);
        }

        let event = ExecutionEvent {
            id: Uuid::new_v4(),
            command: command.to_string(),
            success,
            error_kind,
            duration_ms,
            timestamp: now,
        };
        if self.sender.send(event).is_err() {
            debug!("没有执行事件订阅者: {}", command);
        }
    }

    pub fn stats(&self, command: &str) -> Option<CommandExecutionStats> {
        self.stats.get(command).map(|s| s.value().clone())
    }

    /// 全部统计，按命令名排序
    pub fn snapshot(&self) -> Vec<(String, CommandExecutionStats)> {
        let mut all: Vec<(String, CommandExecutionStats)> = self
            .stats
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for ExecutionTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(ms: u64) -> ExecutionResult {
        ExecutionResult {
            execution_time_ms: Some(ms),
            ..ExecutionResult::success("ok")
        }
    }

    fn failed(kind: ErrorKind, ms: u64) -> ExecutionResult {
        ExecutionResult {
            execution_time_ms: Some(ms),
            ..ExecutionResult::failure(kind, "failed")
        }
    }

    #[test]
    fn test_stats_accumulate() {
        let telemetry = ExecutionTelemetry::new();
        telemetry.record("@git:status", &ok(10));
        telemetry.record("@git:status", &failed(ErrorKind::HandlerFailure, 30));

        let stats = telemetry.stats("@git:status").unwrap();
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.avg_execution_time_ms, 20);
        assert!(stats.last_called_at.is_some());
        assert!(telemetry.stats("/help").is_none());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let telemetry = ExecutionTelemetry::new();
        let mut rx = telemetry.subscribe();
        telemetry.record("/help", &ok(1));
        telemetry.record("@swdp:build", &failed(ErrorKind::InvalidArguments, 2));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.command, "/help");
        assert!(first.success);

        let second = rx.recv().await.unwrap();
        assert!(!second.success);
        assert_eq!(second.error_kind, Some(ErrorKind::InvalidArguments));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_snapshot_sorted() {
        let telemetry = ExecutionTelemetry::new();
        telemetry.record("@pocket:ls", &ok(1));
        telemetry.record("/help", &ok(1));
        let names: Vec<String> = telemetry.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["/help", "@pocket:ls"]);
    }

    #[test]
    fn test_unknown_commands_share_one_entry() {
        let telemetry = ExecutionTelemetry::new();
        for i in 0..500 {
            telemetry.record(&format!("/typo{}", i), &failed(ErrorKind::UnknownCommand, 0));
        }
        telemetry.record("/help", &ok(1));

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.len(), 2);
        let unknown = telemetry.stats(UNKNOWN_COMMAND_KEY).unwrap();
        assert_eq!(unknown.failure_count, 500);
        assert!(telemetry.stats("/typo0").is_none());
    }

    #[test]
    fn test_error_flag_counts_as_failure() {
        let telemetry = ExecutionTelemetry::new();
        let result = ExecutionResult {
            error: true,
            ..ok(3)
        };
        telemetry.record("@pocket:cat", &result);
        let stats = telemetry.stats("@pocket:cat").unwrap();
        assert_eq!(stats.success_count, 0);
        assert_eq!(stats.failure_count, 1);
    }
}
