//! 存储模块
//!
//! 提供翻译缓存和持久化存储功能。

pub mod cache;
pub mod redb_store;

use std::rc::Rc;

pub use cache::{CacheStats, CacheStore, MemoryStore, TranslationCache};
pub use redb_store::RedbStore;

use crate::translation::{config::TranslationConfig, error::TranslationResult};

/// 按配置打开翻译缓存
///
/// 配置了 `cache_path` 时使用 redb 磁盘缓存（必要时创建父目录），否则使用内存 LRU。
pub fn open_cache(config: &TranslationConfig) -> TranslationResult<TranslationCache> {
    match &config.cache_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let store = RedbStore::open(path)?;
            Ok(TranslationCache::new(Rc::new(store)))
        }
        None => Ok(TranslationCache::in_memory()),
    }
}
