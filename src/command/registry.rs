/*!
 * CommandRegistry - 命令注册表
 * 负责：按 (domain, id) 注册/查找命令定义、汇总帮助信息、推荐命令、广播变更事件
 *
 * 领域表由一把读写锁保护；查找都是同步的，不会跨 await 持有锁。
 */

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::definition::CommandDefinition;
use super::events::{RegistryEvent, RegistryEventSender};
use super::types::CommandUsage;
use crate::plugin::CommandPlugin;
use crate::resolver::DomainDescriptor;
use crate::suggest::{rank_commands, CompositeScorer, ScoreCalculator, SuggestionContext};

/// 单个领域的条目
struct DomainEntry {
    /// 按注册顺序排列
    definitions: Vec<Arc<CommandDefinition>>,
    descriptor: Option<Arc<DomainDescriptor>>,
    /// 所属插件（非持有引用）；插件消失后该领域视为没有任何命令
    owner: Option<Weak<dyn CommandPlugin>>,
}

impl DomainEntry {
    fn empty() -> Self {
        Self {
            definitions: Vec::new(),
            descriptor: None,
            owner: None,
        }
    }

    fn is_available(&self) -> bool {
        self.owner
            .as_ref()
            .map_or(true, |owner| owner.strong_count() > 0)
    }
}

/// 命令注册表
pub struct CommandRegistry {
    domains: RwLock<BTreeMap<String, DomainEntry>>,
    events: RegistryEventSender,
    scorer: Box<dyn ScoreCalculator>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_scorer(Box::new(CompositeScorer::default_composite()))
    }

    /// 使用自定义评分器（用于命令推荐）
    pub fn with_scorer(scorer: Box<dyn ScoreCalculator>) -> Self {
        Self {
            domains: RwLock::new(BTreeMap::new()),
            events: RegistryEventSender::new(),
            scorer,
        }
    }

    /// 注册命令；相同 (domain, id) 覆盖旧定义并保留原位置
    pub fn register(&self, definition: CommandDefinition) {
        let domain = definition.domain.clone();
        let id = definition.id.clone();
        let definition = Arc::new(definition);

        let replaced = {
            let mut domains = self.domains.write();
            let entry = domains
                .entry(domain.clone())
                .or_insert_with(DomainEntry::empty);
            match entry.definitions.iter_mut().find(|d| d.id == id) {
                Some(slot) => {
                    *slot = definition;
                    true
                }
                None => {
                    entry.definitions.push(definition);
                    false
                }
            }
        };

        if replaced {
            debug!("覆盖已注册的命令: {}:{}", domain, id);
        } else {
            debug!("注册命令: {}:{}", domain, id);
        }
        self.events.send_registered(&domain, &id, replaced);
    }

    pub fn register_all<I>(&self, definitions: I)
    where
        I: IntoIterator<Item = CommandDefinition>,
    {
        for definition in definitions {
            self.register(definition);
        }
    }

    /// 整体替换一个领域：插件激活与刷新时使用
    ///
    /// 定义中重复的 id 以最后一个为准。
    pub fn register_domain(
        &self,
        domain: &str,
        definitions: Vec<CommandDefinition>,
        descriptor: Option<DomainDescriptor>,
        owner: Option<Weak<dyn CommandPlugin>>,
    ) -> usize {
        let mut ordered: Vec<Arc<CommandDefinition>> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if definition.domain != domain {
                warn!(
                    "忽略领域不匹配的命令 {}:{}（期望领域 {}）",
                    definition.domain, definition.id, domain
                );
                continue;
            }
            let definition = Arc::new(definition);
            match ordered.iter_mut().find(|d| d.id == definition.id) {
                Some(slot) => *slot = definition,
                None => ordered.push(definition),
            }
        }

        let count = ordered.len();
        {
            let mut domains = self.domains.write();
            domains.insert(
                domain.to_string(),
                DomainEntry {
                    definitions: ordered,
                    descriptor: descriptor.map(Arc::new),
                    owner,
                },
            );
        }

        info!("领域 {} 注册了 {} 个命令", domain, count);
        self.events.send_domain_registered(domain, count);
        count
    }

    /// 注销一个领域的全部命令，返回移除的数量
    pub fn unregister_domain(&self, domain: &str) -> usize {
        let removed = {
            let mut domains = self.domains.write();
            domains
                .remove(domain)
                .map(|entry| entry.definitions.len())
        };

        match removed {
            Some(count) => {
                info!("注销领域 {}（{} 个命令）", domain, count);
                self.events.send_unregistered(domain, count);
                count
            }
            None => 0,
        }
    }

    /// 按 (domain, action) 查找；动作也可以是别名
    pub fn resolve(&self, domain: &str, action: &str) -> Option<Arc<CommandDefinition>> {
        let domains = self.domains.read();
        let entry = domains.get(domain)?;
        if !entry.is_available() {
            debug!("领域 {} 的插件已不可用", domain);
            return None;
        }
        entry
            .definitions
            .iter()
            .find(|d| d.id == action)
            .or_else(|| entry.definitions.iter().find(|d| d.answers_to(action)))
            .map(Arc::clone)
    }

    /// 领域内的命令定义，按注册顺序
    pub fn definitions(&self, domain: &str) -> Vec<Arc<CommandDefinition>> {
        let domains = self.domains.read();
        domains
            .get(domain)
            .filter(|entry| entry.is_available())
            .map(|entry| entry.definitions.clone())
            .unwrap_or_default()
    }

    pub fn descriptor(&self, domain: &str) -> Option<Arc<DomainDescriptor>> {
        let domains = self.domains.read();
        domains
            .get(domain)
            .filter(|entry| entry.is_available())
            .and_then(|entry| entry.descriptor.clone())
    }

    /// 当前可用的领域名（有序）
    pub fn domains(&self) -> Vec<String> {
        let domains = self.domains.read();
        domains
            .iter()
            .filter(|(_, entry)| entry.is_available() && !entry.definitions.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn contains_domain(&self, domain: &str) -> bool {
        !self.definitions(domain).is_empty()
    }

    /// 全部命令的用法：先按领域名，再按注册顺序
    pub fn all_usages(&self) -> Vec<CommandUsage> {
        self.all_definitions().iter().map(|d| d.usage()).collect()
    }

    pub fn domain_usages(&self, domain: &str) -> Vec<CommandUsage> {
        self.definitions(domain).iter().map(|d| d.usage()).collect()
    }

    /// 根据宿主上下文推荐至多 `limit` 个完整命令名
    pub fn suggest_commands(&self, context: &SuggestionContext, limit: usize) -> Vec<String> {
        let candidates = self.all_definitions();
        rank_commands(&candidates, context, self.scorer.as_ref(), limit)
    }

    /// 订阅注册表变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn all_definitions(&self) -> Vec<Arc<CommandDefinition>> {
        let domains = self.domains.read();
        domains
            .values()
            .filter(|entry| entry.is_available())
            .flat_map(|entry| entry.definitions.iter().cloned())
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
