/*!
 * 配置类型定义
 *
 * 所有字段都有默认值，配置文件中可以只写需要覆盖的部分。
 */

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

/// 管线总配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub resolver: ResolverConfig,
    pub pipeline: PipelineSettings,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub git: GitConfig,
}

/// 自然语言解析参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// 关键词分数必须严格大于该值才跳过模型
    pub high_confidence_threshold: f64,
    /// 关键词结果的置信度折扣
    pub heuristic_dampening: f64,
    /// 使用默认动作时的置信度
    pub fallback_confidence: f64,
    pub model_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: defaults::HIGH_CONFIDENCE_THRESHOLD,
            heuristic_dampening: defaults::HEURISTIC_DAMPENING,
            fallback_confidence: defaults::FALLBACK_CONFIDENCE,
            model_timeout_secs: defaults::MODEL_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// 自然语言转换的置信度达到该值才自动执行
    pub auto_execute_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            auto_execute_threshold: defaults::AUTO_EXECUTE_THRESHOLD,
        }
    }
}

/// OpenAI 兼容的模型端点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// 存放 API key 的环境变量名；为空表示不带认证
    pub api_key_env: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: defaults::MODEL_ENDPOINT.to_string(),
            model: defaults::MODEL_NAME.to_string(),
            api_key_env: Some(defaults::MODEL_API_KEY_ENV.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter 语法，RUST_LOG 优先
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    /// git 命令的工作目录；未设置时使用当前目录
    pub workdir: Option<PathBuf>,
}
