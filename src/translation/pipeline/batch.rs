//! 片段解析器模块
//!
//! 把一批候选文本解析为译文。每个去重后的片段依次经过：
//!
//! 1. 手动词典（精确匹配，或 `case = false` 的不区分大小写词条）
//! 2. 翻译缓存
//! 3. 远程翻译（按批次大小分组、顺序发送）
//!
//! 远程调用失败时该批次的片段一律回退为原文，不影响其它批次。
//! 成功结果写入缓存，写入失败被忽略。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let resolver = FragmentResolver::new(&translator, &cache, config.terms(), "zh", "", 100, &stats);
//! let translated = resolver.resolve_texts(&["Buy SKU1234 now".to_string()]).await;
//! ```

use std::collections::{HashMap, HashSet};

use crate::translation::client::RemoteTranslator;
use crate::translation::config::TermTable;
use crate::translation::core::service::ServiceStats;
use crate::translation::storage::TranslationCache;

use super::terms::split_by_terms;

/// 片段解析器（单次翻译批次内使用）
pub struct FragmentResolver<'a> {
    translator: &'a dyn RemoteTranslator,
    cache: &'a TranslationCache,
    terms: &'a TermTable,
    target_lang: &'a str,
    source_lang: &'a str,
    batch_size: usize,
    stats: &'a ServiceStats,
}

impl<'a> FragmentResolver<'a> {
    pub fn new(
        translator: &'a dyn RemoteTranslator,
        cache: &'a TranslationCache,
        terms: &'a TermTable,
        target_lang: &'a str,
        source_lang: &'a str,
        batch_size: usize,
        stats: &'a ServiceStats,
    ) -> Self {
        Self {
            translator,
            cache,
            terms,
            target_lang,
            source_lang,
            batch_size: batch_size.max(1),
            stats,
        }
    }

    /// 解析完整文本：按术语拆分，解析各片段，再按原顺序拼接
    ///
    /// 片段去掉首尾空白后再查词典、查缓存和发送，解析完成后把原有空白接回。
    /// 返回值与输入等长、顺序一致。
    pub async fn resolve_texts(&self, texts: &[String]) -> Vec<String> {
        let split: Vec<Vec<String>> = texts
            .iter()
            .map(|text| split_by_terms(text, self.terms))
            .collect();

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for part in split.iter().flatten() {
            let (_, core, _) = trim_edges(part);
            if !core.is_empty() && seen.insert(core) {
                unique.push(core.to_string());
            }
        }

        let resolved = self.resolve(&unique).await;

        split
            .iter()
            .map(|parts| {
                parts
                    .iter()
                    .map(|part| {
                        let (leading, core, trailing) = trim_edges(part);
                        match resolved.get(core) {
                            Some(translation) if !translation.is_empty() => {
                                format!("{}{}{}", leading, translation, trailing)
                            }
                            _ => part.clone(),
                        }
                    })
                    .collect::<String>()
            })
            .collect()
    }

    /// 解析互不相同的片段，返回 片段 -> 译文
    pub async fn resolve(&self, fragments: &[String]) -> HashMap<String, String> {
        let mut resolved: HashMap<String, String> = HashMap::with_capacity(fragments.len());
        let mut queued: HashSet<&str> = HashSet::new();
        let mut queue: Vec<String> = Vec::new();

        for fragment in fragments {
            if resolved.contains_key(fragment) || queued.contains(fragment.as_str()) {
                continue;
            }

            if let Some(entry) = self.terms.lookup(fragment) {
                tracing::debug!("词典命中: {}", fragment);
                self.stats.record_dictionary_hit();
                resolved.insert(fragment.clone(), entry.to.clone());
                continue;
            }

            if let Some(cached) = self
                .cache
                .get(fragment, self.target_lang, self.source_lang)
                .await
            {
                self.stats.record_cache_hit();
                resolved.insert(fragment.clone(), cached);
                continue;
            }

            self.stats.record_cache_miss();
            queued.insert(fragment.as_str());
            queue.push(fragment.clone());
        }

        for chunk in queue.chunks(self.batch_size) {
            self.stats.record_network_request();
            let source = if self.source_lang.is_empty() {
                None
            } else {
                Some(self.source_lang)
            };

            match self.translator.translate(chunk, self.target_lang, source).await {
                Ok(results) if results.len() == chunk.len() => {
                    let (texts, translations): (Vec<String>, Vec<String>) = chunk
                        .iter()
                        .zip(&results)
                        .filter(|(_, translation)| !translation.is_empty())
                        .map(|(text, translation)| (text.clone(), translation.clone()))
                        .unzip();
                    self.cache
                        .set_batch(&texts, &translations, self.target_lang, self.source_lang)
                        .await;

                    resolved.extend(chunk.iter().cloned().zip(results));
                }
                Ok(results) => {
                    tracing::warn!(
                        "翻译结果条数不一致（请求 {} 条，返回 {} 条），保留原文",
                        chunk.len(),
                        results.len()
                    );
                    self.stats.record_network_failure();
                    Self::fall_back(&mut resolved, chunk);
                }
                Err(e) => {
                    tracing::warn!("批量翻译失败，{} 条片段保留原文: {}", chunk.len(), e);
                    self.stats.record_network_failure();
                    Self::fall_back(&mut resolved, chunk);
                }
            }
        }

        self.stats.record_fragments_resolved(fragments.len());
        resolved
    }

    fn fall_back(resolved: &mut HashMap<String, String>, chunk: &[String]) {
        for text in chunk {
            resolved.insert(text.clone(), text.clone());
        }
    }
}

/// 拆成 (前导空白, 内容, 尾随空白)
fn trim_edges(text: &str) -> (&str, &str, &str) {
    let start = text.trim_start();
    let leading = &text[..text.len() - start.len()];
    let core = start.trim_end();
    let trailing = &start[core.len()..];
    (leading, core, trailing)
}
