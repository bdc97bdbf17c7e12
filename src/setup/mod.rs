//! 应用程序初始化：按配置组装注册表、插件、解析器、执行器与管线

pub mod error;

pub use error::{SetupError, SetupResult};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::command::executor::CommandExecutor;
use crate::command::registry::CommandRegistry;
use crate::command::telemetry::ExecutionTelemetry;
use crate::config::{ConfigReader, ModelConfig, PipelineConfig};
use crate::domains::{register_builtin_plugins, BuiltinBackends};
use crate::llm::{ModelCapability, OpenAiCompatibleModel};
use crate::pipeline::CommandPipeline;
use crate::plugin::PluginHost;
use crate::resolver::NaturalLanguageResolver;
use crate::utils::logging;

const BUILTIN_PLUGIN_COUNT: usize = 4;

/// 组装好的管线及其共享组件
pub struct PipelineComponents {
    pub registry: Arc<CommandRegistry>,
    pub host: Arc<PluginHost>,
    pub telemetry: Arc<ExecutionTelemetry>,
    pub executor: Arc<CommandExecutor>,
    pub resolver: Arc<NaturalLanguageResolver>,
    pub pipeline: Arc<CommandPipeline>,
}

/// 读取配置：显式路径优先，否则使用默认位置
pub async fn load_config(path: Option<PathBuf>) -> SetupResult<PipelineConfig> {
    let reader = match path {
        Some(path) => ConfigReader::with_path(path),
        None => ConfigReader::new().map_err(SetupError::Config)?,
    };
    reader.load().await.map_err(SetupError::Config)
}

pub fn init_logging(config: &PipelineConfig) -> SetupResult<()> {
    logging::init_logging(&config.logging.level).map_err(SetupError::Logging)
}

/// 按 `[model]` 配置创建模型；未启用或创建失败时返回 None，解析器会走回退路径
pub fn model_from_config(config: &ModelConfig) -> Option<Arc<dyn ModelCapability>> {
    if !config.enabled {
        info!("未启用语言模型，自然语言解析只使用关键词匹配");
        return None;
    }
    match OpenAiCompatibleModel::from_config(config) {
        Ok(model) => {
            info!("语言模型: {} @ {}", config.model, config.endpoint);
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!("语言模型创建失败，禁用第二阶段: {:#}", e);
            None
        }
    }
}

/// 组装整条管线
pub fn build_pipeline(
    config: &PipelineConfig,
    backends: BuiltinBackends,
    model: Option<Arc<dyn ModelCapability>>,
) -> SetupResult<PipelineComponents> {
    let registry = Arc::new(CommandRegistry::new());
    let host = Arc::new(PluginHost::new(Arc::clone(&registry)));

    let registered = register_builtin_plugins(&host, &config.git, backends);
    if registered != BUILTIN_PLUGIN_COUNT {
        return Err(SetupError::BuiltinPlugins {
            registered,
            expected: BUILTIN_PLUGIN_COUNT,
        });
    }

    let telemetry = Arc::new(ExecutionTelemetry::default());
    let executor = Arc::new(CommandExecutor::with_telemetry(
        Arc::clone(&registry),
        Arc::clone(&telemetry),
    ));

    let mut resolver = NaturalLanguageResolver::new(Arc::clone(&registry), config.resolver.clone());
    if let Some(model) = model {
        resolver = resolver.with_model(model);
    }
    let resolver = Arc::new(resolver);

    let pipeline = Arc::new(CommandPipeline::new(
        Arc::clone(&executor),
        Arc::clone(&resolver),
        config.pipeline.clone(),
    ));

    Ok(PipelineComponents {
        registry,
        host,
        telemetry,
        executor,
        resolver,
        pipeline,
    })
}
