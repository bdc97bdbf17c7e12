/*!
 * 配置系统
 *
 * 基于 TOML 的管线配置：解析阈值、模型端点、日志级别与 git 工作目录。
 */

pub mod defaults;
pub mod reader;
pub mod types;
pub mod validator;

pub use reader::{default_config_path, ConfigReader};
pub use types::*;
pub use validator::ConfigValidator;
