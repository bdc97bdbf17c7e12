//! 语言模型接入

pub mod capability;
pub mod openai;

pub use capability::ModelCapability;
pub use openai::OpenAiCompatibleModel;
