//! 翻译管道集成测试
//!
//! 从整页翻译入口测试扫描、提取、术语拆分、解析与回写的组合行为

use std::rc::Rc;

use async_trait::async_trait;
use markup5ever_rcdom::Handle;
use tokio::sync::Notify;

use pagelingo::parsers::html::dom::{find_first_element, has_class, serialize_node};
use pagelingo::translation::{
    DictEntry, NoopHooks, SchedulerState, TranslationCache, TranslationConfig, TranslationHooks,
};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{build_service, config, fixtures, parse, text_of, CountingHooks, MockTranslator};

/// `<p>Hello <b>world</b></p>`：两个元素分别翻译，标记结构保留
#[tokio::test]
async fn test_hello_world_keeps_markup() {
    common::init_tracing();
    let dom = parse(fixtures::HELLO_WORLD);
    let translator = MockTranslator::new();
    let service = build_service(
        &dom,
        config("zh"),
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    let applied = service.translate_page().await;
    assert_eq!(applied, 2);

    assert_eq!(translator.calls(), vec![vec!["Hello".to_string(), "world".to_string()]]);
    assert_eq!(text_of(&dom, "p"), "[zh]Hello [zh]world");
    assert_eq!(text_of(&dom, "b"), "[zh]world");

    let p = find_first_element(&dom.document, "p").unwrap();
    let html = serialize_node(&p).unwrap();
    assert!(html.contains("<b class=\"pagelingo-done\">[zh]world</b>"), "{}", html);
    assert!(has_class(&p, "pagelingo-done"));
    assert!(!has_class(&p, "pagelingo-pending"));

    println!("✅ Hello/world 场景通过");
}

/// 非独立术语被切出，由词典解析，其余片段走远程翻译
#[tokio::test]
async fn test_sku_term_is_protected() {
    let dom = parse(fixtures::SKU);
    let translator = MockTranslator::new();
    let config = TranslationConfig::builder("fr")
        .dict_entry("fr", "SKU", DictEntry::new("SKU").standalone(false))
        .build()
        .unwrap();
    let service = build_service(
        &dom,
        config,
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    service.translate_page().await;

    assert_eq!(
        translator.calls(),
        vec![vec!["Buy".to_string(), "1234 now".to_string()]]
    );
    assert_eq!(text_of(&dom, "p"), "[fr]Buy SKU[fr]1234 now");
    assert_eq!(service.stats().dictionary_hits, 1);

    println!("✅ SKU 术语场景通过");
}

/// 翻译服务会去掉首尾空白：术语两侧的空格仍按原样保留
#[tokio::test]
async fn test_term_spacing_survives_trimming_translator() {
    let dom = parse(fixtures::SKU);
    let translator = MockTranslator::trimming();
    translator.set_translation("Buy", "<Buy>");
    translator.set_translation("1234 now", "<1234 now>");
    let config = TranslationConfig::builder("fr")
        .dict_entry("fr", "SKU", DictEntry::new("SKU").standalone(false))
        .build()
        .unwrap();
    let service = build_service(
        &dom,
        config,
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    service.translate_page().await;

    assert_eq!(translator.sent_texts(), vec!["Buy", "1234 now"]);
    assert_eq!(text_of(&dom, "p"), "<Buy> SKU<1234 now>");

    println!("✅ 术语两侧空白保留");
}

/// 独立术语整段匹配时不经过网络
#[tokio::test]
async fn test_standalone_term_resolves_from_dictionary() {
    let dom = parse("<html><body><a>Home</a><a>home</a></body></html>");
    let translator = MockTranslator::new();
    let config = TranslationConfig::builder("fr")
        .dict_entry("*", "Home", DictEntry::new("Accueil"))
        .build()
        .unwrap();
    let service = build_service(
        &dom,
        config,
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    service.translate_page().await;

    // 区分大小写：小写的 home 仍需远程翻译
    assert_eq!(translator.sent_texts(), vec!["home".to_string()]);
    assert_eq!(text_of(&dom, "a"), "Accueil");

    println!("✅ 独立术语直接由词典解析");
}

/// 忽略区域、代码、输入框与纯符号文本都不会被送去翻译
#[tokio::test]
async fn test_ignored_content_is_not_sent() {
    let dom = parse(fixtures::MIXED_PAGE);
    let translator = MockTranslator::new();
    let config = TranslationConfig::builder("de")
        .add_ignore(".notranslate")
        .build()
        .unwrap();
    let service = build_service(
        &dom,
        config,
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    service.translate_page().await;

    let mut sent = translator.sent_texts();
    sent.sort();
    assert_eq!(sent, vec!["Docs", "Home", "Welcome"]);
    assert_eq!(text_of(&dom, "span"), "Me too");
    assert_eq!(text_of(&dom, "code"), "let x = 1;");
    assert_eq!(text_of(&dom, "textarea"), "draft");

    println!("✅ 忽略规则生效");
}

/// force 选择器覆盖其子树内的忽略规则
#[tokio::test]
async fn test_force_overrides_ignore() {
    let dom = parse(
        "<html><body><div class=\"notranslate\"><p class=\"must\">Forced</p><p>Skipped</p></div></body></html>",
    );
    let translator = MockTranslator::new();
    let config = TranslationConfig::builder("zh")
        .add_ignore(".notranslate")
        .add_force(".must")
        .build()
        .unwrap();
    let service = build_service(
        &dom,
        config,
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    service.translate_page().await;

    assert_eq!(translator.sent_texts(), vec!["Forced".to_string()]);
    println!("✅ force 选择器优先于忽略规则");
}

/// 多段文本按长度比例回写，空白原样保留
#[tokio::test]
async fn test_multi_run_redistribution() {
    let dom = parse("<html><body><p>ab <i>x</i> cd</p></body></html>");
    let translator = MockTranslator::new();
    translator.set_translation("ab cd", "ABCDEFGHI");
    let service = build_service(
        &dom,
        config("zh"),
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    service.translate_page().await;

    // 9 个字符按 2:2 切分 -> 5 + 4
    assert_eq!(text_of(&dom, "p"), "ABCDE [zh]x FGHI");
    println!("✅ 多段文本比例回写");
}

/// 译文为空或与原文相同：不写回，但标记完成
#[tokio::test]
async fn test_pass_through_translations_are_marked_done() {
    let dom = parse("<html><body><p>Same</p><h2>Blank</h2></body></html>");
    let translator = MockTranslator::new();
    translator.set_translation("Same", "Same");
    translator.set_translation("Blank", "");
    let cache = TranslationCache::in_memory();
    let service = build_service(&dom, config("zh"), &translator, cache.clone(), Rc::new(NoopHooks));

    assert_eq!(service.translate_page().await, 2);

    assert_eq!(text_of(&dom, "p"), "Same");
    assert_eq!(text_of(&dom, "h2"), "Blank");
    let h2 = find_first_element(&dom.document, "h2").unwrap();
    assert!(has_class(&h2, "pagelingo-done"));

    // 空译文不写入缓存
    assert_eq!(cache.stats().writes, 1);
    println!("✅ 空译文与相同译文按原样保留");
}

/// 第二次整页翻译不再发起请求；同一缓存下的新文档全部命中缓存
#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let cache = TranslationCache::in_memory();
    let translator = MockTranslator::new();

    let dom = parse(fixtures::THREE_PARAGRAPHS);
    let service = build_service(&dom, config("ja"), &translator, cache.clone(), Rc::new(NoopHooks));
    service.translate_page().await;
    assert_eq!(translator.call_count(), 1);

    assert_eq!(service.translate_page().await, 0);
    assert_eq!(translator.call_count(), 1);

    let fresh = parse(fixtures::THREE_PARAGRAPHS);
    let service = build_service(&fresh, config("ja"), &translator, cache, Rc::new(NoopHooks));
    assert_eq!(service.translate_page().await, 3);
    assert_eq!(translator.call_count(), 1);
    assert_eq!(service.stats().cache_hits, 3);
    assert_eq!(text_of(&fresh, "p"), "[ja]First");

    println!("✅ 重复翻译零网络请求");
}

/// 相同文本只翻译一次；批次大小限制单次请求的条数
#[tokio::test]
async fn test_dedup_and_batch_size() {
    let dom = parse(
        "<html><body><p>One</p><p>Two</p><p>One</p><p>Three</p><p>Four</p></body></html>",
    );
    let translator = MockTranslator::new();
    let config = TranslationConfig::builder("zh").batch_size(2).build().unwrap();
    let service = build_service(
        &dom,
        config,
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    assert_eq!(service.translate_page().await, 5);

    let mut sent = translator.sent_texts();
    sent.sort();
    assert_eq!(sent, vec!["Four", "One", "Three", "Two"]);
    assert!(translator.calls().iter().all(|call| call.len() <= 2));

    println!("✅ 去重与批次大小");
}

/// 钩子：before/after 成对调用，before_element 可以跳过元素
#[tokio::test]
async fn test_hooks_fire() {
    let dom = parse(fixtures::THREE_PARAGRAPHS);
    let translator = MockTranslator::new();
    let hooks = Rc::new(CountingHooks::skipping("Second"));
    let service = build_service(
        &dom,
        config("zh"),
        &translator,
        TranslationCache::in_memory(),
        hooks.clone(),
    );

    assert_eq!(service.translate_page().await, 2);

    assert_eq!(hooks.before.get(), 1);
    assert_eq!(hooks.after.get(), 1);
    assert_eq!(
        *hooks.elements.borrow(),
        vec![
            ("First".to_string(), "[zh]First".to_string()),
            ("Third".to_string(), "[zh]Third".to_string()),
        ]
    );
    assert!(!translator.sent_texts().contains(&"Second".to_string()));

    println!("✅ 生命周期钩子");
}

/// 每个元素的检查都要等测试放行
struct HeldHooks {
    release: Notify,
}

#[async_trait(?Send)]
impl TranslationHooks for HeldHooks {
    async fn before_element(&self, _element: &Handle) -> bool {
        self.release.notified().await;
        true
    }
}

/// before_element 是挂起点：钩子完成之前不会发出远程请求
#[tokio::test]
async fn test_before_element_is_awaited() {
    let dom = parse(fixtures::HELLO_WORLD);
    let translator = MockTranslator::new();
    let hooks = Rc::new(HeldHooks {
        release: Notify::new(),
    });
    let service = build_service(
        &dom,
        config("zh"),
        &translator,
        TranslationCache::in_memory(),
        hooks.clone(),
    );

    let pass = service.translate_page();
    let interleave = async {
        tokio::task::yield_now().await;
        assert_eq!(service.state(), SchedulerState::FullPass);
        assert_eq!(translator.call_count(), 0);

        hooks.release.notify_one();
        tokio::task::yield_now().await;
        assert_eq!(translator.call_count(), 0);
        hooks.release.notify_one();
    };

    let (applied, ()) = tokio::join!(pass, interleave);
    assert_eq!(applied, 2);
    assert_eq!(translator.call_count(), 1);
    assert_eq!(text_of(&dom, "b"), "[zh]world");

    println!("✅ before_element 钩子被等待");
}

/// 内置的忽略标记类无需额外配置即可生效
#[tokio::test]
async fn test_builtin_ignore_marker() {
    let dom = parse(
        "<html><body><p>Open</p><div class=\"pagelingo-ignore\"><p>Closed</p></div></body></html>",
    );
    let translator = MockTranslator::new();
    let service = build_service(
        &dom,
        config("fr"),
        &translator,
        TranslationCache::in_memory(),
        Rc::new(NoopHooks),
    );

    assert_eq!(service.translate_page().await, 1);
    assert_eq!(translator.sent_texts(), vec!["Open"]);
    assert_eq!(text_of(&dom, "body"), "[fr]OpenClosed");

    println!("✅ 内置忽略标记类生效");
}
