//! 插件：以领域为单位向注册表贡献命令

pub mod host;

pub use host::{PluginHost, PluginRegistration};

use serde::{Deserialize, Serialize};

use crate::command::definition::CommandDefinition;
use crate::resolver::DomainDescriptor;

/// 内置插件可以占用任何领域；外部插件不能覆盖内置插件的领域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginOrigin {
    Internal,
    External,
}

/// 命令插件
///
/// `commands()` 在激活和刷新时各调用一次，返回的定义必须都属于 `domain()`。
pub trait CommandPlugin: Send + Sync {
    fn id(&self) -> &str;

    fn domain(&self) -> &str;

    fn commands(&self) -> Vec<CommandDefinition>;

    /// 自然语言描述符，没有则只能通过显式命令调用
    fn descriptor(&self) -> Option<DomainDescriptor> {
        None
    }
}
