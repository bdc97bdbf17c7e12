/*!
 * OpenAI 兼容的 Chat Completions 模型
 *
 * 只做非流式调用：一条 user 消息进，第一条 choice 的文本出。
 */

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::capability::ModelCapability;
use crate::command::error::CommandError;
use crate::config::ModelConfig;
use crate::utils::error::AppResult;

/// 全局共享的 HTTP 客户端，复用连接
static SHARED_HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(60))
        .build()
        .expect("Failed to create shared HTTP client")
});

pub struct OpenAiCompatibleModel {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAiCompatibleModel {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            temperature: 0.0,
        }
    }

    /// 从配置构建；API key 从 `api_key_env` 指定的环境变量读取
    pub fn from_config(config: &ModelConfig) -> AppResult<Self> {
        let api_key = match config.api_key_env.as_deref() {
            Some(var) if !var.is_empty() => Some(
                std::env::var(var).with_context(|| format!("环境变量 {} 未设置", var))?,
            ),
            _ => None,
        };
        Ok(Self::new(&config.endpoint, &config.model, api_key))
    }

    fn chat_endpoint(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "stream": false
        })
    }

    fn handle_error_response(status: StatusCode, body: &str) -> CommandError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("unexpected response: {}", body));
        CommandError::ModelRequest(format!("{} {}", status.as_u16(), message))
    }

    /// 取出第一条 choice 的文本内容
    pub fn extract_content(response: &Value) -> Result<String, CommandError> {
        response["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| CommandError::ModelResponse("missing choices[0].message.content".into()))
    }
}

#[async_trait]
impl ModelCapability for OpenAiCompatibleModel {
    async fn query(&self, prompt: &str) -> AppResult<String> {
        let mut request = SHARED_HTTP_CLIENT
            .post(self.chat_endpoint())
            .json(&self.build_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CommandError::ModelRequest(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CommandError::ModelRequest(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::handle_error_response(status, &body).into());
        }

        let json: Value = serde_json::from_str(&body).map_err(CommandError::from)?;
        let content = Self::extract_content(&json)?;
        debug!("模型 {} 返回 {} 字符", self.model, content.chars().count());
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
