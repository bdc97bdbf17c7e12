use async_trait::async_trait;

use crate::utils::error::AppResult;

/// 语言模型能力：输入提示词，返回原始文本
///
/// 解析、超时与回退都由调用方负责，实现只需要完成一次请求。
#[async_trait]
pub trait ModelCapability: Send + Sync {
    async fn query(&self, prompt: &str) -> AppResult<String>;

    /// 用于日志
    fn name(&self) -> &str {
        "model"
    }
}
