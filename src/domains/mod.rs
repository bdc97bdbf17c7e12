/*!
 * 内置领域插件
 *
 * - system: 斜杠命令（help / domains / version / suggest）
 * - git: git 命令行
 * - pocket: 对象存储
 * - swdp: 构建门户
 */

pub mod git;
pub mod pocket;
pub mod swdp;
pub mod system;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GitConfig;
use crate::plugin::{CommandPlugin, PluginHost, PluginOrigin};

pub use git::{GitCli, GitError, GitPlugin};
pub use pocket::{MemoryPocketBackend, PocketBackend, PocketEntry, PocketPlugin};
pub use swdp::{BuildRecord, BuildStatus, MemorySwdpBackend, SwdpBackend, SwdpPlugin};
pub use system::SystemPlugin;

/// 内置领域使用的存储后端
#[derive(Clone)]
pub struct BuiltinBackends {
    pub pocket: Arc<dyn PocketBackend>,
    pub swdp: Arc<dyn SwdpBackend>,
}

impl Default for BuiltinBackends {
    fn default() -> Self {
        Self {
            pocket: Arc::new(MemoryPocketBackend::new()),
            swdp: Arc::new(MemorySwdpBackend::new()),
        }
    }
}

/// 注册所有内置插件，返回成功注册的插件数
pub fn register_builtin_plugins(
    host: &PluginHost,
    git: &GitConfig,
    backends: BuiltinBackends,
) -> usize {
    let plugins: Vec<Arc<dyn CommandPlugin>> = vec![
        Arc::new(SystemPlugin::new(host.registry())),
        Arc::new(GitPlugin::new(GitCli::new(git.workdir.clone()))),
        Arc::new(PocketPlugin::new(backends.pocket)),
        Arc::new(SwdpPlugin::new(backends.swdp)),
    ];

    let total = plugins.len();
    let mut registered = 0;
    for plugin in plugins {
        let id = plugin.id().to_string();
        if host.register_plugin(plugin, PluginOrigin::Internal) {
            registered += 1;
        } else {
            warn!("内置插件 {} 注册失败", id);
        }
    }
    info!("已注册 {}/{} 个内置插件", registered, total);
    registered
}
