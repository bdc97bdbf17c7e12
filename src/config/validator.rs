/*!
 * 配置验证器
 */

use anyhow::bail;
use tracing::debug;

use super::types::{ModelConfig, PipelineConfig, ResolverConfig};
use crate::utils::error::AppResult;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// 收集所有问题后一次性报告
    pub fn validate(&self, config: &PipelineConfig) -> AppResult<()> {
        let mut errors = Vec::new();

        errors.extend(self.validate_resolver(&config.resolver));
        if !in_unit_range(config.pipeline.auto_execute_threshold) {
            errors.push(format!(
                "pipeline.auto_execute_threshold 必须在 0.0 到 1.0 之间: {}",
                config.pipeline.auto_execute_threshold
            ));
        }
        errors.extend(self.validate_model(&config.model));
        if config.logging.level.trim().is_empty() {
            errors.push("logging.level 不能为空".to_string());
        }

        if !errors.is_empty() {
            bail!("配置验证失败: {}", errors.join(", "));
        }

        debug!("配置验证通过");
        Ok(())
    }

    fn validate_resolver(&self, resolver: &ResolverConfig) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("high_confidence_threshold", resolver.high_confidence_threshold),
            ("heuristic_dampening", resolver.heuristic_dampening),
            ("fallback_confidence", resolver.fallback_confidence),
        ] {
            if !in_unit_range(value) {
                errors.push(format!("resolver.{} 必须在 0.0 到 1.0 之间: {}", name, value));
            }
        }
        if resolver.model_timeout_secs == 0 {
            errors.push("resolver.model_timeout_secs 必须大于 0".to_string());
        }
        errors
    }

    fn validate_model(&self, model: &ModelConfig) -> Vec<String> {
        let mut errors = Vec::new();
        if !model.enabled {
            return errors;
        }
        if !(model.endpoint.starts_with("http://") || model.endpoint.starts_with("https://")) {
            errors.push(format!("model.endpoint 必须是 http(s) 地址: {}", model.endpoint));
        }
        if model.model.trim().is_empty() {
            errors.push("model.model 不能为空".to_string());
        }
        errors
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn in_unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ConfigValidator::new()
            .validate(&PipelineConfig::default())
            .is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = PipelineConfig::default();
        config.resolver.fallback_confidence = -0.1;
        config.resolver.model_timeout_secs = 0;
        config.pipeline.auto_execute_threshold = f64::NAN;

        let message = ConfigValidator::new().validate(&config).unwrap_err().to_string();
        assert!(message.contains("fallback_confidence"));
        assert!(message.contains("model_timeout_secs"));
        assert!(message.contains("auto_execute_threshold"));
    }

    #[test]
    fn test_model_checked_only_when_enabled() {
        let mut config = PipelineConfig::default();
        config.model.endpoint = "ftp://nope".into();
        assert!(ConfigValidator::new().validate(&config).is_ok());

        config.model.enabled = true;
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
