//! command-bridge 命令解析管线
//!
//! 把一行用户输入变成一次命令执行：
//! - `@domain:action args` / `/action args` 直接解析执行
//! - `@domain 自由文本` 先由自然语言解析器转换成命令
//! - 领域通过插件注册，执行结果统一为 `ExecutionResult`

// 模块声明
pub mod command; // 解析、定义、注册、执行
pub mod config; // TOML 配置
pub mod domains; // 内置领域插件
pub mod llm; // 语言模型接入
pub mod pipeline; // 输入到结果的完整流程
pub mod plugin; // 插件宿主
pub mod resolver; // 自然语言解析
pub mod setup; // 组装
pub mod suggest; // 命令推荐评分
pub mod utils; // 错误处理与日志

pub use command::{
    Command, CommandDefinition, CommandExecutor, CommandParser, CommandRegistry, ErrorKind,
    ExecutionResult, HandlerOutput, Route,
};
pub use pipeline::{CommandPipeline, PipelineOutcome};
pub use plugin::{CommandPlugin, PluginHost, PluginOrigin};
pub use resolver::{CommandConversion, DomainDescriptor, NaturalLanguageResolver};
