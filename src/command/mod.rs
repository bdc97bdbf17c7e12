//! 命令核心：解析、定义、注册、执行

pub mod definition;
pub mod error;
pub mod events;
pub mod executor;
pub mod parser;
pub mod registry;
pub mod telemetry;
pub mod types;

pub use definition::{
    handler_fn, Arity, CommandDefinition, CommandHandler, FnHandler, HandlerOutput, Validatable,
};
pub use error::{CommandError, CommandErrorInfo};
pub use events::{RegistryEvent, RegistryEventSender};
pub use executor::CommandExecutor;
pub use parser::{CommandParser, Route};
pub use registry::CommandRegistry;
pub use telemetry::{CommandExecutionStats, ExecutionEvent, ExecutionTelemetry, UNKNOWN_COMMAND_KEY};
pub use types::{Command, CommandPrefix, CommandUsage, ErrorKind, ExecutionResult, SYSTEM_DOMAIN};
