//! 远程翻译客户端
//!
//! 翻译服务是外部协作者，引擎只依赖 `RemoteTranslator` 抽象。

pub mod microsoft;
pub mod token;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};

pub use microsoft::MicrosoftTranslator;
pub use token::{AuthToken, MemoryTokenStore, TokenStore};

/// 语言检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub language: String,
    pub score: f64,
    pub translation_supported: bool,
}

/// 支持的语言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    pub native_name: String,
    /// 书写方向：`ltr` 或 `rtl`
    pub dir: String,
}

/// 远程翻译服务
#[async_trait(?Send)]
pub trait RemoteTranslator {
    /// 批量翻译，返回结果与输入等长且顺序一致
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> TranslationResult<Vec<String>>;

    /// 检测每段文本的语言
    async fn detect_language(&self, _texts: &[String]) -> TranslationResult<Vec<DetectedLanguage>> {
        Err(TranslationError::InvalidInput(
            "当前翻译器不支持语言检测".to_string(),
        ))
    }

    /// 列出服务支持的目标语言
    async fn supported_languages(&self) -> TranslationResult<Vec<LanguageInfo>> {
        Err(TranslationError::InvalidInput(
            "当前翻译器不支持语言列表查询".to_string(),
        ))
    }
}
