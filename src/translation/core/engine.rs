//! 翻译引擎
//!
//! 把扫描、提取、解析、回写串成一次完整的处理：
//!
//! 1. 从根节点（或新插入的子树）扫描出候选元素
//! 2. 提取每个元素的直接文本，丢弃没有可翻译内容的元素
//! 3. 按批次交给片段解析器（词典 → 缓存 → 远程）
//! 4. 将译文写回文本段，并打上完成标记
//!
//! 引擎不关心调度，何时调用、调用几次由 [`TranslationService`](super::TranslationService) 决定。

use std::cell::Cell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{add_class, is_connected, remove_class};
use crate::translation::{
    client::RemoteTranslator,
    config::TranslationConfig,
    error::{TranslationError, TranslationResult},
    pipeline::{
        batch::FragmentResolver,
        collector::{direct_text_runs, extract_text, TextRun},
        filters::{scan, FilterContext},
        redistribute::{redistribute, write_run},
    },
    storage::TranslationCache,
};

use super::hooks::TranslationHooks;
use super::service::ServiceStats;

/// 一个待写回的元素
struct Job {
    element: Handle,
    original: String,
    runs: Vec<TextRun>,
    per_run: bool,
}

impl Job {
    fn fragment_count(&self) -> usize {
        if self.per_run {
            self.runs.len()
        } else {
            1
        }
    }
}

/// 翻译引擎
///
/// 持有文档与各协作者的共享引用；所有方法都在同一线程上运行，
/// 仅在远程调用、缓存访问和钩子处让出执行。
pub struct TranslationEngine {
    document: Handle,
    config: Rc<TranslationConfig>,
    translator: Rc<dyn RemoteTranslator>,
    cache: TranslationCache,
    hooks: Rc<dyn TranslationHooks>,
    stats: Rc<ServiceStats>,
    /// 销毁后到达的结果一律丢弃
    destroyed: Cell<bool>,
}

impl TranslationEngine {
    pub fn new(
        document: Handle,
        config: Rc<TranslationConfig>,
        translator: Rc<dyn RemoteTranslator>,
        cache: TranslationCache,
        hooks: Rc<dyn TranslationHooks>,
        stats: Rc<ServiceStats>,
    ) -> Self {
        Self {
            document,
            config,
            translator,
            cache,
            hooks,
            stats,
            destroyed: Cell::new(false),
        }
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn document(&self) -> &Handle {
        &self.document
    }

    pub fn hooks(&self) -> &dyn TranslationHooks {
        self.hooks.as_ref()
    }

    pub fn mark_destroyed(&self) {
        self.destroyed.set(true);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// 按 `root` 选择器查找翻译根节点
    pub fn find_root(&self) -> Option<Handle> {
        self.config.root_selector().query_first(&self.document)
    }

    /// 扫描 `root` 下的候选元素
    pub fn collect_candidates(&self, root: &Handle, include_root: bool) -> Vec<Handle> {
        let mut ctx = FilterContext::from_config(&self.config);
        ctx.prepare(root);
        scan(root, &ctx, include_root)
    }

    /// 整页翻译，返回写回（或标记完成）的元素数
    pub async fn translate_page(&self) -> TranslationResult<usize> {
        let root = self.find_root().ok_or_else(|| {
            TranslationError::InvalidInput(format!("未找到翻译根节点: {}", self.config.root))
        })?;

        let candidates = self.collect_candidates(&root, false);
        tracing::debug!("整页扫描得到 {} 个候选元素", candidates.len());

        Ok(self.translate_elements(candidates).await)
    }

    /// 翻译一组元素
    ///
    /// 没有可翻译文本的元素被跳过（不打完成标记）。元素按文档顺序分批，
    /// 每批解析完成后立即写回。
    pub async fn translate_elements(&self, elements: Vec<Handle>) -> usize {
        self.stats.record_elements_scanned(elements.len());

        let items: Vec<(Handle, String)> = elements
            .into_iter()
            .filter_map(|element| extract_text(&element).map(|text| (element, text)))
            .collect();

        let mut applied = 0;
        for chunk in items.chunks(self.config.batch_size.max(1)) {
            if self.is_destroyed() {
                break;
            }
            applied += self.translate_batch(chunk).await;
        }
        applied
    }

    async fn translate_batch(&self, items: &[(Handle, String)]) -> usize {
        let config = self.config.as_ref();
        let mut jobs = Vec::with_capacity(items.len());

        for (element, text) in items {
            if !self.hooks.before_element(element).await {
                tracing::debug!("before_element 钩子跳过元素: {}", text);
                continue;
            }

            add_class(element, &config.pending_class);
            let runs = direct_text_runs(element);
            let per_run = config.translate_runs_separately && runs.len() > 1;
            jobs.push(Job {
                element: element.clone(),
                original: text.clone(),
                runs,
                per_run,
            });
        }

        if jobs.is_empty() {
            return 0;
        }

        let inputs: Vec<String> = jobs
            .iter()
            .flat_map(|job| {
                if job.per_run {
                    job.runs.iter().map(|run| run.text.clone()).collect()
                } else {
                    vec![job.original.clone()]
                }
            })
            .collect();

        let resolver = FragmentResolver::new(
            self.translator.as_ref(),
            &self.cache,
            config.terms(),
            &config.target_lang,
            &config.source_lang,
            config.batch_size,
            &self.stats,
        );
        let outputs = resolver.resolve_texts(&inputs).await;

        let mut outputs = outputs.into_iter();
        let mut applied = 0;

        for job in jobs {
            let translations: Vec<String> = outputs.by_ref().take(job.fragment_count()).collect();

            if self.is_destroyed() {
                remove_class(&job.element, &config.pending_class);
                continue;
            }

            if !is_connected(&job.element, &self.document)
                || extract_text(&job.element).as_deref() != Some(job.original.as_str())
            {
                // 等待期间元素被移除或文本被改写，交给后续的排空处理
                tracing::debug!("元素在翻译期间发生变化，放弃写回: {}", job.original);
                remove_class(&job.element, &config.pending_class);
                continue;
            }

            let translated = self.apply(&job, &translations);

            remove_class(&job.element, &config.pending_class);
            add_class(&job.element, &config.done_class);
            self.hooks.after_element(&job.element, &job.original, &translated);
            self.stats.record_element_translated();
            applied += 1;
        }

        applied
    }

    /// 写回译文，返回元素的整体译文
    ///
    /// 译文为空或与原文相同时不写回。
    fn apply(&self, job: &Job, translations: &[String]) -> String {
        if job.per_run {
            for (run, translated) in job.runs.iter().zip(translations) {
                if !translated.is_empty() && *translated != run.text {
                    write_run(run, translated);
                }
            }
            return translations.join(" ");
        }

        let translated = translations.first().cloned().unwrap_or_default();
        if translated.is_empty() || translated == job.original {
            return translated;
        }

        redistribute(&job.runs, &translated);
        translated
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use async_trait::async_trait;

    use super::*;
    use crate::parsers::html::dom::{find_first_element, has_class, html_to_dom, text_content};
    use crate::translation::core::hooks::NoopHooks;

    struct Upper {
        calls: RefCell<usize>,
    }

    #[async_trait(?Send)]
    impl RemoteTranslator for Upper {
        async fn translate(
            &self,
            texts: &[String],
            _target_lang: &str,
            _source_lang: Option<&str>,
        ) -> TranslationResult<Vec<String>> {
            *self.calls.borrow_mut() += 1;
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    fn engine(html: &str, config: TranslationConfig) -> (TranslationEngine, Rc<Upper>) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let translator = Rc::new(Upper {
            calls: RefCell::new(0),
        });
        let engine = TranslationEngine::new(
            dom.document.clone(),
            Rc::new(config),
            translator.clone(),
            TranslationCache::in_memory(),
            Rc::new(NoopHooks),
            Rc::new(ServiceStats::default()),
        );
        (engine, translator)
    }

    #[tokio::test]
    async fn test_translate_page_marks_done() {
        let config = TranslationConfig::builder("en").build().unwrap();
        let (engine, translator) = engine("<p>hello <b>big</b></p><code>x()</code>", config);

        let applied = engine.translate_page().await.unwrap();
        assert_eq!(applied, 2);
        assert_eq!(*translator.calls.borrow(), 1);

        let p = find_first_element(engine.document(), "p").unwrap();
        assert!(has_class(&p, "pagelingo-done"));
        assert!(!has_class(&p, "pagelingo-pending"));
        assert_eq!(text_content(&p), "HELLO BIG");

        let code = find_first_element(engine.document(), "code").unwrap();
        assert_eq!(text_content(&code), "x()");
    }

    #[tokio::test]
    async fn test_runs_translated_separately() {
        let config = TranslationConfig::builder("en")
            .translate_runs_separately(true)
            .build()
            .unwrap();
        let (engine, _) = engine("<p> one <br> three </p>", config);

        engine.translate_page().await.unwrap();
        let p = find_first_element(engine.document(), "p").unwrap();
        assert_eq!(text_content(&p), " ONE  THREE ");
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let config = TranslationConfig::builder("en").root("main").build().unwrap();
        let (engine, translator) = engine("<p>hello</p>", config);

        assert!(engine.translate_page().await.is_err());
        assert_eq!(*translator.calls.borrow(), 0);
    }

    #[tokio::test]
    async fn test_destroyed_engine_drops_results() {
        let config = TranslationConfig::builder("en").build().unwrap();
        let (engine, _) = engine("<p>hello</p>", config);
        engine.mark_destroyed();

        let p = find_first_element(engine.document(), "p").unwrap();
        assert_eq!(engine.translate_elements(vec![p.clone()]).await, 0);
        assert_eq!(text_content(&p), "hello");
        assert!(!has_class(&p, "pagelingo-done"));
    }
}
