// 集成测试公共模块
//
// 提供测试辅助工具：HTML 样例、可编排的模拟翻译器、计数钩子、失败的缓存存储

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::Notify;

use pagelingo::parsers::html::dom::{
    append_child, create_nodes, find_first_element, get_text, html_to_dom, text_content,
};
use pagelingo::translation::{
    CacheStore, RemoteTranslator, TranslationCache, TranslationConfig, TranslationError,
    TranslationHooks, TranslationResult, TranslationService,
};

/// HTML 样例
pub mod fixtures {
    pub const HELLO_WORLD: &str = "<html><body><p>Hello <b>world</b></p></body></html>";

    pub const SKU: &str = "<html><body><p>Buy SKU1234 now</p></body></html>";

    pub const THREE_PARAGRAPHS: &str =
        "<html><body><p>First</p><p>Second</p><p>Third</p></body></html>";

    pub const MIXED_PAGE: &str = r#"<html><body>
        <h1>Welcome</h1>
        <div class="notranslate"><p>Keep me</p><span>Me too</span></div>
        <pre><code>let x = 1;</code></pre>
        <nav><a href="/">Home</a> | <a href="/docs">Docs</a></nav>
        <p class="badge"> 42 </p>
        <textarea>draft</textarea>
    </body></html>"#;
}

/// 初始化测试日志（重复调用无副作用）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn parse(html: &str) -> RcDom {
    html_to_dom(html.as_bytes(), "utf-8").expect("测试 HTML 可解析")
}

pub fn body(dom: &RcDom) -> Handle {
    find_first_element(&dom.document, "body").expect("文档包含 body")
}

/// 第一个 `tag` 元素的全部文本
pub fn text_of(dom: &RcDom, tag: &str) -> String {
    find_first_element(&dom.document, tag)
        .map(|node| text_content(&node))
        .unwrap_or_default()
}

/// 把 HTML 片段追加到 `parent`，返回插入的顶层节点
pub fn insert_html(parent: &Handle, html: &str) -> Vec<Handle> {
    let nodes = create_nodes(html).expect("HTML 片段可解析");
    for node in &nodes {
        append_child(parent, node);
    }
    nodes
}

/// 元素的第一个文本子节点
pub fn first_text_node(element: &Handle) -> Handle {
    element
        .children
        .borrow()
        .iter()
        .find(|child| get_text(child).is_some())
        .cloned()
        .expect("元素包含文本节点")
}

pub fn config(target: &str) -> TranslationConfig {
    TranslationConfig::builder(target).build().expect("默认配置有效")
}

pub fn build_service(
    dom: &RcDom,
    config: TranslationConfig,
    translator: &Rc<MockTranslator>,
    cache: TranslationCache,
    hooks: Rc<dyn TranslationHooks>,
) -> TranslationService {
    TranslationService::new(dom.document.clone(), config, translator.clone(), cache, hooks)
}

// ============================================================================
// 模拟翻译器
// ============================================================================

/// 让测试在第一次远程调用处暂停
pub struct Gate {
    /// 第一次调用开始时通知
    pub started: Notify,
    /// 测试放行后第一次调用才返回
    pub release: Notify,
    armed: Cell<bool>,
}

/// 可编排的模拟翻译器
///
/// 默认把 `text` 译为 `[目标语言]text`；可以为个别文本指定固定译文，
/// 也可以让所有调用失败。每次调用的输入都被记录下来。
pub struct MockTranslator {
    calls: RefCell<Vec<Vec<String>>>,
    overrides: RefCell<HashMap<String, String>>,
    fail: Cell<bool>,
    trim: Cell<bool>,
    gate: Option<Gate>,
}

impl MockTranslator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::build(None))
    }

    /// 第一次调用会等待 `gate().release`
    pub fn gated() -> Rc<Self> {
        Rc::new(Self::build(Some(Gate {
            started: Notify::new(),
            release: Notify::new(),
            armed: Cell::new(true),
        })))
    }

    pub fn failing() -> Rc<Self> {
        let translator = Self::build(None);
        translator.fail.set(true);
        Rc::new(translator)
    }

    /// 像真实服务一样去掉译文首尾空白
    pub fn trimming() -> Rc<Self> {
        let translator = Self::build(None);
        translator.trim.set(true);
        Rc::new(translator)
    }

    fn build(gate: Option<Gate>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            overrides: RefCell::new(HashMap::new()),
            fail: Cell::new(false),
            trim: Cell::new(false),
            gate,
        }
    }

    pub fn set_translation(&self, text: &str, translation: &str) {
        self.overrides
            .borrow_mut()
            .insert(text.to_string(), translation.to_string());
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("翻译器带有闸门")
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// 所有调用中发送过的文本
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls.borrow().iter().flatten().cloned().collect()
    }
}

#[async_trait(?Send)]
impl RemoteTranslator for MockTranslator {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        _source_lang: Option<&str>,
    ) -> TranslationResult<Vec<String>> {
        self.calls.borrow_mut().push(texts.to_vec());

        if let Some(gate) = &self.gate {
            if gate.armed.replace(false) {
                gate.started.notify_one();
                gate.release.notified().await;
            }
        }

        if self.fail.get() {
            return Err(TranslationError::ServiceError {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }

        let overrides = self.overrides.borrow();
        Ok(texts
            .iter()
            .map(|text| {
                let translated = overrides
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| format!("[{}]{}", target_lang, text));
                if self.trim.get() {
                    translated.trim().to_string()
                } else {
                    translated
                }
            })
            .collect())
    }
}

// ============================================================================
// 钩子与存储
// ============================================================================

/// 记录调用次数的钩子；原文等于 `skip` 的元素被跳过
#[derive(Default)]
pub struct CountingHooks {
    pub before: Cell<usize>,
    pub after: Cell<usize>,
    pub elements: RefCell<Vec<(String, String)>>,
    pub skip: Option<String>,
}

impl CountingHooks {
    pub fn skipping(text: &str) -> Self {
        Self {
            skip: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait(?Send)]
impl TranslationHooks for CountingHooks {
    async fn before(&self) {
        self.before.set(self.before.get() + 1);
    }

    async fn after(&self) {
        self.after.set(self.after.get() + 1);
    }

    async fn before_element(&self, element: &Handle) -> bool {
        tokio::task::yield_now().await;
        match &self.skip {
            Some(skip) => text_content(element).trim() != skip,
            None => true,
        }
    }

    fn after_element(&self, _element: &Handle, original: &str, translated: &str) {
        self.elements
            .borrow_mut()
            .push((original.to_string(), translated.to_string()));
    }
}

/// 读写都失败的缓存存储
pub struct FailingStore;

#[async_trait(?Send)]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> TranslationResult<Option<String>> {
        Err(TranslationError::CacheError("磁盘不可用".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> TranslationResult<()> {
        Err(TranslationError::CacheError("磁盘不可用".to_string()))
    }
}
