//! 翻译缓存模块
//!
//! `TranslationCache` 以 (原文, 目标语言, 源语言) 三元组的哈希为键，
//! 把持久化细节交给 `CacheStore` 实现。读写失败一律按未命中处理，不阻断翻译。

use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

// ============================================================================
// 存储抽象
// ============================================================================

/// 键值存储（键为不透明字符串）
#[async_trait(?Send)]
pub trait CacheStore {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> TranslationResult<()>;
}

/// 进程内 LRU 存储
pub struct MemoryStore {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(constants::DEFAULT_MEMORY_CACHE_CAPACITY)
    }
}

#[async_trait(?Send)]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| TranslationError::CacheError(format!("获取缓存锁失败: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> TranslationResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| TranslationError::CacheError(format!("获取缓存锁失败: {}", e)))?;
        entries.put(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// 翻译缓存
// ============================================================================

/// 缓存统计信息
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 翻译缓存
#[derive(Clone)]
pub struct TranslationCache {
    store: Rc<dyn CacheStore>,
    hits: Rc<AtomicU64>,
    misses: Rc<AtomicU64>,
    writes: Rc<AtomicU64>,
    errors: Rc<AtomicU64>,
}

impl TranslationCache {
    pub fn new(store: Rc<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: Rc::new(AtomicU64::new(0)),
            misses: Rc::new(AtomicU64::new(0)),
            writes: Rc::new(AtomicU64::new(0)),
            errors: Rc::new(AtomicU64::new(0)),
        }
    }

    /// 基于内存 LRU 的缓存
    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStore::default()))
    }

    /// 生成缓存键
    pub fn generate_key(text: &str, target_lang: &str, source_lang: &str) -> String {
        let digest = blake3::hash(format!("{}|{}|{}", text, target_lang, source_lang).as_bytes());
        format!("tr:{}", digest.to_hex())
    }

    /// 读取译文；存储错误视为未命中
    pub async fn get(&self, text: &str, target_lang: &str, source_lang: &str) -> Option<String> {
        let key = Self::generate_key(text, target_lang, source_lang);

        match self.store.get(&key).await {
            Ok(Some(value)) if !value.is_empty() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Ok(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                tracing::debug!("缓存读取失败，按未命中处理: {}", e);
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 写入译文；失败只记录日志
    pub async fn set(&self, text: &str, translation: &str, target_lang: &str, source_lang: &str) {
        let key = Self::generate_key(text, target_lang, source_lang);

        match self.store.set(&key, translation).await {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!("缓存写入失败: {}", e);
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub async fn get_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
    ) -> Vec<Option<String>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.get(text, target_lang, source_lang).await);
        }
        results
    }

    /// 按位置成对写入，多余的一侧被忽略
    pub async fn set_batch(
        &self,
        texts: &[String],
        translations: &[String],
        target_lang: &str,
        source_lang: &str,
    ) {
        if texts.len() != translations.len() {
            tracing::warn!(
                "批量缓存写入长度不一致: {} 条原文, {} 条译文",
                texts.len(),
                translations.len()
            );
        }

        for (text, translation) in texts.iter().zip(translations) {
            self.set(text, translation, target_lang, source_lang).await;
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("stats", &self.stats())
            .finish()
    }
}
