/*!
 * 集成测试工具
 *
 * 模拟语言模型与预置数据的测试环境
 */

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use command_bridge::config::PipelineConfig;
use command_bridge::domains::{BuiltinBackends, MemoryPocketBackend, MemorySwdpBackend};
use command_bridge::llm::ModelCapability;
use command_bridge::setup::{build_pipeline, PipelineComponents};
use command_bridge::utils::error::{app_error, AppResult};

enum MockReply {
    Text(String),
    Fail(String),
}

/// 模拟模型：固定回复或固定失败，记录收到的提示词
pub struct MockModel {
    reply: MockReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Text(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Fail(message.into()))
    }

    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl ModelCapability for MockModel {
    async fn query(&self, prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Fail(message) => Err(app_error(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 预置对象的 pocket 存储
pub fn seeded_pocket() -> MemoryPocketBackend {
    MemoryPocketBackend::new()
        .with_object("readme.md", "# pocket\n")
        .with_object("docs/guide.md", "intro\nTODO: write more\n")
        .with_object("docs/api/index.md", "endpoints\n")
        .with_object("src/main.rs", "fn main() {}\n")
}

/// 测试环境
pub struct TestEnvironment {
    pub components: PipelineComponents,
    pub pocket: Arc<MemoryPocketBackend>,
    pub swdp: Arc<MemorySwdpBackend>,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_model(model: Arc<dyn ModelCapability>) -> Self {
        Self::build(Some(model))
    }

    fn build(model: Option<Arc<dyn ModelCapability>>) -> Self {
        let pocket = Arc::new(seeded_pocket());
        let swdp = Arc::new(MemorySwdpBackend::new());
        let backends = BuiltinBackends {
            pocket: pocket.clone(),
            swdp: swdp.clone(),
        };
        let components = build_pipeline(&PipelineConfig::default(), backends, model)
            .expect("failed to build pipeline");
        Self {
            components,
            pocket,
            swdp,
        }
    }
}
