//! 翻译模块
//!
//! - **config**: 会话配置、手动词典、配置文件与环境变量
//! - **client**: 远程翻译服务客户端与令牌缓存
//! - **storage**: 翻译缓存（内存 LRU / redb）
//! - **pipeline**: 过滤扫描、文本提取、术语拆分、片段解析、译文回写
//! - **core**: 翻译引擎、变更调度与翻译服务
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use pagelingo::translation::{
//!     open_cache, ConfigManager, MicrosoftTranslator, NoopHooks, TranslationService,
//! };
//!
//! let config = ConfigManager::new().load()?;
//! let cache = open_cache(&config)?;
//! let translator = MicrosoftTranslator::new(&config.service)?;
//!
//! let dom = pagelingo::html_to_dom(html.as_bytes(), "utf-8")?;
//! let service = TranslationService::new(
//!     dom.document.clone(),
//!     config,
//!     Rc::new(translator),
//!     cache,
//!     Rc::new(NoopHooks),
//! );
//! service.translate().await;
//! ```

/// 远程翻译服务客户端
pub mod client;

/// 配置管理模块
pub mod config;

/// 核心模块 - 翻译引擎、调度与服务
pub mod core;

/// 错误处理模块
pub mod error;

/// 翻译管道模块
pub mod pipeline;

/// 存储管理模块
pub mod storage;

// ============================================================================
// 公共 API 导出
// ============================================================================

pub use client::{
    AuthToken, DetectedLanguage, LanguageInfo, MemoryTokenStore, MicrosoftTranslator,
    RemoteTranslator, TokenStore,
};
pub use config::{
    ConfigBuilder, ConfigFile, ConfigManager, DictEntry, ManualDictionary, ServiceConfig,
    TranslationConfig,
};
pub use core::{
    MutationRecord, NoopHooks, SchedulerState, ServiceStats, ServiceStatsSnapshot,
    TranslationEngine, TranslationHooks, TranslationService,
};
pub use error::{TranslationError, TranslationResult};
pub use storage::{open_cache, CacheStore, MemoryStore, RedbStore, TranslationCache};
