//! 配置默认值

pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const HEURISTIC_DAMPENING: f64 = 0.8;
pub const FALLBACK_CONFIDENCE: f64 = 0.3;
pub const MODEL_TIMEOUT_SECS: u64 = 15;

pub const AUTO_EXECUTE_THRESHOLD: f64 = 0.7;

pub const MODEL_ENDPOINT: &str = "https://api.openai.com/v1";
pub const MODEL_NAME: &str = "gpt-4o-mini";
pub const MODEL_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const LOG_LEVEL: &str = "info";

/// 配置目录名（位于系统配置目录下）
pub const CONFIG_DIR_NAME: &str = "command-bridge";
pub const CONFIG_FILE_NAME: &str = "config.toml";
