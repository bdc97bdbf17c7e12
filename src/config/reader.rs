/*!
 * TOML 配置读取器
 *
 * 负责定位并解析配置文件；文件不存在时返回默认配置。
 */

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tokio::fs;
use tracing::{debug, info};

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use super::types::PipelineConfig;
use super::validator::ConfigValidator;
use crate::utils::error::AppResult;

pub struct ConfigReader {
    config_path: PathBuf,
}

impl ConfigReader {
    /// 使用默认路径：`<系统配置目录>/command-bridge/config.toml`
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            config_path: default_config_path()?,
        })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 读取、解析并验证配置
    pub async fn load(&self) -> AppResult<PipelineConfig> {
        debug!("开始加载配置: {:?}", self.config_path);

        if !self.config_path.exists() {
            info!("配置文件不存在，使用默认配置: {}", self.config_path.display());
            return Ok(PipelineConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("无法读取配置文件: {}", self.config_path.display()))?;
        let config = self.parse_toml_content(&content)?;
        ConfigValidator::new().validate(&config)?;

        info!("配置加载成功: {}", self.config_path.display());
        Ok(config)
    }

    pub fn parse_toml_content(&self, content: &str) -> AppResult<PipelineConfig> {
        toml::from_str::<PipelineConfig>(content)
            .with_context(|| format!("TOML配置解析失败 (文件: {})", self.config_path.display()))
    }
}

pub fn default_config_path() -> AppResult<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("无法确定系统配置目录"))?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
