//! # Pagelingo
//!
//! 在可变 HTML 文档中增量翻译文本：保留标记结构，避免重复的网络请求，
//! 已翻译的内容不会再次翻译。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML 解析、DOM 操作与选择器匹配
//! - `translation` - 配置、缓存、翻译客户端、翻译管道与服务

pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use parsers::{html_to_dom, serialize_node};
pub use translation::{
    MutationRecord, NoopHooks, TranslationConfig, TranslationError, TranslationHooks,
    TranslationResult, TranslationService,
};
