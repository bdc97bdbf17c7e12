/*!
 * PluginHost - 插件宿主
 *
 * 持有插件的强引用；注册表只拿到弱引用，插件被移除后其领域自动失效。
 * 一个领域同一时间只属于一个插件，后注册者覆盖先注册者（外部插件不能覆盖内置插件）。
 */

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CommandPlugin, PluginOrigin};
use crate::command::definition::CommandDefinition;
use crate::command::error::CommandError;
use crate::command::parser::is_identifier;
use crate::command::registry::CommandRegistry;
use crate::command::types::SYSTEM_DOMAIN;

/// 插件注册记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRegistration {
    pub plugin_id: String,
    pub domain: String,
    pub commands: Vec<String>,
    pub origin: PluginOrigin,
    pub enabled: bool,
}

struct PluginSlot {
    plugin: Arc<dyn CommandPlugin>,
    origin: PluginOrigin,
    enabled: bool,
    commands: Vec<String>,
}

impl PluginSlot {
    fn registration(&self) -> PluginRegistration {
        PluginRegistration {
            plugin_id: self.plugin.id().to_string(),
            domain: self.plugin.domain().to_string(),
            commands: self.commands.clone(),
            origin: self.origin,
            enabled: self.enabled,
        }
    }
}

pub struct PluginHost {
    registry: Arc<CommandRegistry>,
    /// 按注册顺序
    plugins: RwLock<Vec<PluginSlot>>,
}

impl PluginHost {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            plugins: RwLock::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// 激活插件并注册其命令；被拒绝时返回 false 且不注册任何东西
    pub fn register_plugin(&self, plugin: Arc<dyn CommandPlugin>, origin: PluginOrigin) -> bool {
        match self.try_register(plugin, origin) {
            Ok(count) => count > 0,
            Err(err) => {
                warn!("{}", err);
                false
            }
        }
    }

    fn try_register(
        &self,
        plugin: Arc<dyn CommandPlugin>,
        origin: PluginOrigin,
    ) -> Result<usize, CommandError> {
        let plugin_id = plugin.id().to_string();
        let domain = plugin.domain().to_string();
        let reject = |reason: String| CommandError::PluginRejected {
            plugin_id: plugin_id.clone(),
            reason,
        };

        if !is_identifier(&domain) {
            return Err(reject(format!("invalid domain `{}`", domain)));
        }
        if origin == PluginOrigin::External && domain == SYSTEM_DOMAIN {
            return Err(reject("the system domain is reserved".to_string()));
        }

        let definitions = plugin.commands();
        check_definitions(&domain, &definitions).map_err(reject)?;

        let mut plugins = self.plugins.write();
        if origin == PluginOrigin::External {
            let owned_internally = plugins.iter().any(|slot| {
                slot.origin == PluginOrigin::Internal
                    && slot.plugin.domain() == domain
                    && slot.plugin.id() != plugin_id
            });
            if owned_internally {
                return Err(reject(format!(
                    "domain `{}` belongs to a built-in plugin",
                    domain
                )));
            }
        }

        // 同一 id 换了领域：旧领域的命令一并注销
        let stale: Vec<String> = plugins
            .iter()
            .filter(|slot| slot.plugin.id() == plugin_id && slot.plugin.domain() != domain)
            .map(|slot| slot.plugin.domain().to_string())
            .collect();
        for old_domain in &stale {
            self.registry.unregister_domain(old_domain);
            debug!("插件 {} 从领域 {} 迁移到 {}", plugin_id, old_domain, domain);
        }

        // 同一领域或同一 id 的旧插件被替换
        plugins.retain(|slot| slot.plugin.id() != plugin_id && slot.plugin.domain() != domain);

        let commands: Vec<String> = definitions.iter().map(|d| d.id.clone()).collect();
        let count = self.registry.register_domain(
            &domain,
            definitions,
            plugin.descriptor(),
            Some(Arc::downgrade(&plugin)),
        );
        plugins.push(PluginSlot {
            plugin,
            origin,
            enabled: true,
            commands,
        });

        info!("插件 {} 注册领域 {}（{} 个命令）", plugin_id, domain, count);
        Ok(count)
    }

    /// 停用插件：注销其领域，保留记录以便重新启用
    pub fn disable_plugin(&self, plugin_id: &str) -> bool {
        let mut plugins = self.plugins.write();
        let Some(slot) = plugins.iter_mut().find(|s| s.plugin.id() == plugin_id) else {
            return false;
        };
        if slot.enabled {
            slot.enabled = false;
            self.registry.unregister_domain(slot.plugin.domain());
            info!("停用插件 {}", plugin_id);
        }
        true
    }

    pub fn enable_plugin(&self, plugin_id: &str) -> bool {
        let enabled = self
            .plugins
            .read()
            .iter()
            .find(|s| s.plugin.id() == plugin_id)
            .map(|s| s.enabled);
        match enabled {
            None => false,
            Some(true) => true,
            Some(false) => self.refresh_plugin(plugin_id),
        }
    }

    /// 重新拉取插件的命令并替换其领域
    pub fn refresh_plugin(&self, plugin_id: &str) -> bool {
        let plugin = {
            let plugins = self.plugins.read();
            match plugins.iter().find(|s| s.plugin.id() == plugin_id) {
                Some(slot) => Arc::clone(&slot.plugin),
                None => return false,
            }
        };

        let domain = plugin.domain().to_string();
        let definitions = plugin.commands();
        if let Err(reason) = check_definitions(&domain, &definitions) {
            warn!("刷新插件 {} 失败: {}", plugin_id, reason);
            return false;
        }

        let commands: Vec<String> = definitions.iter().map(|d| d.id.clone()).collect();
        let mut plugins = self.plugins.write();
        let Some(slot) = plugins.iter_mut().find(|s| s.plugin.id() == plugin_id) else {
            return false;
        };
        self.registry.register_domain(
            &domain,
            definitions,
            plugin.descriptor(),
            Some(Arc::downgrade(&slot.plugin)),
        );
        slot.enabled = true;
        slot.commands = commands;
        debug!("刷新插件 {}", plugin_id);
        true
    }

    /// 移除插件并注销其领域
    pub fn remove_plugin(&self, plugin_id: &str) -> bool {
        let removed = {
            let mut plugins = self.plugins.write();
            let mut domain = None;
            plugins.retain(|slot| {
                if slot.plugin.id() == plugin_id {
                    domain = Some(slot.plugin.domain().to_string());
                    false
                } else {
                    true
                }
            });
            domain
        };

        match removed {
            Some(domain) => {
                self.registry.unregister_domain(&domain);
                info!("移除插件 {}", plugin_id);
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, plugin_id: &str) -> bool {
        self.plugins
            .read()
            .iter()
            .any(|s| s.plugin.id() == plugin_id && s.enabled)
    }

    pub fn registrations(&self) -> Vec<PluginRegistration> {
        self.plugins.read().iter().map(PluginSlot::registration).collect()
    }

    /// 领域当前的所属插件 id
    pub fn owner_of(&self, domain: &str) -> Option<String> {
        self.plugins
            .read()
            .iter()
            .find(|s| s.plugin.domain() == domain)
            .map(|s| s.plugin.id().to_string())
    }
}

fn check_definitions(domain: &str, definitions: &[CommandDefinition]) -> Result<(), String> {
    if definitions.is_empty() {
        return Err("plugin provides no commands".to_string());
    }
    if let Some(stray) = definitions.iter().find(|d| d.domain != domain) {
        return Err(format!(
            "command `{}` declares domain `{}`, expected `{}`",
            stray.id, stray.domain, domain
        ));
    }
    if let Some(bad) = definitions.iter().find(|d| !is_identifier(&d.id)) {
        return Err(format!("invalid command id `{}`", bad.id));
    }
    Ok(())
}
