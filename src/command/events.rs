//! 命令注册表事件系统
//!
//! 注册与注销都会广播事件，帮助面板、自动补全等订阅方据此刷新。

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// 注册表事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RegistryEvent {
    Registered {
        domain: String,
        id: String,
        replaced: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    DomainRegistered {
        domain: String,
        commands: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    DomainUnregistered {
        domain: String,
        removed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RegistryEvent {
    pub fn domain(&self) -> &str {
        match self {
            RegistryEvent::Registered { domain, .. }
            | RegistryEvent::DomainRegistered { domain, .. }
            | RegistryEvent::DomainUnregistered { domain, .. } => domain,
        }
    }
}

/// 注册表事件发送器
pub struct RegistryEventSender {
    sender: broadcast::Sender<RegistryEvent>,
}

impl RegistryEventSender {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// 发送单条命令注册事件
    pub fn send_registered(&self, domain: &str, id: &str, replaced: bool) {
        let _ = self.sender.send(RegistryEvent::Registered {
            domain: domain.to_string(),
            id: id.to_string(),
            replaced,
            timestamp: chrono::Utc::now(),
        });
    }

    /// 发送整个领域注册事件
    pub fn send_domain_registered(&self, domain: &str, commands: usize) {
        let _ = self.sender.send(RegistryEvent::DomainRegistered {
            domain: domain.to_string(),
            commands,
            timestamp: chrono::Utc::now(),
        });
    }

    /// 发送领域注销事件
    pub fn send_unregistered(&self, domain: &str, removed: usize) {
        let _ = self.sender.send(RegistryEvent::DomainUnregistered {
            domain: domain.to_string(),
            removed,
            timestamp: chrono::Utc::now(),
        });
    }

    /// 订阅注册表变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for RegistryEventSender {
    fn default() -> Self {
        Self::new()
    }
}
