//! 自然语言解析
//!
//! ```text
//! @domain <free text>
//!     ↓
//! heuristic::best_match ── score > 阈值 ──→ CommandConversion (Heuristic)
//!     ↓ 否
//! ModelCapability::query (超时) → json::extract_json → CommandConversion (Model)
//!     ↓ 失败
//! 第一阶段结果 / 领域默认动作 (Fallback)
//! ```

pub mod descriptor;
pub mod extract;
pub mod heuristic;
pub mod json;
pub mod prompt;
#[allow(clippy::module_inception)]
pub mod resolver;
pub mod types;

pub use descriptor::{ActionTriggers, DomainDescriptor};
pub use extract::{quoted_substrings, ArgExtractor, PatternExtractor};
pub use heuristic::HeuristicMatch;
pub use resolver::{NaturalLanguageResolver, DEFAULT_MODEL_CONFIDENCE};
pub use types::{CommandConversion, ConversionAlternative, ConversionOrigin};
