//! 翻译服务
//!
//! 本模块是翻译系统的主要入口点，把翻译引擎与变更调度器组合成一个有生命周期的服务。
//!
//! ## 职责划分
//!
//! - `TranslationEngine`: 扫描、提取、解析、回写（一次处理）
//! - `MutationScheduler`: 待处理集合与互斥状态（何时处理）
//! - `TranslationService`: 对外接口，负责二者之间的协调与错误边界
//!
//! ## 运行模型
//!
//! 服务运行在单个线程上（`Rc` + `Cell`，不是 `Send`），只在远程调用、缓存访问和
//! 钩子处让出执行。因此"并发"只指同一线程上交错执行的多个 future：
//!
//! - 整页翻译与增量处理互斥：整页翻译期间暂停观察，结束后恢复
//! - 同一时刻至多一次排空；排空期间到达的变更只入队，由正在运行的排空循环再处理一轮
//! - 整页翻译与增量处理内部的错误都在边界处记录日志，不会传播给调用方
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use pagelingo::translation::{
//!     MicrosoftTranslator, NoopHooks, TranslationCache, TranslationConfig, TranslationService,
//! };
//!
//! let config = TranslationConfig::builder("zh").auto(true).build()?;
//! let translator = MicrosoftTranslator::new(&config.service)?;
//! let service = TranslationService::new(
//!     dom.document.clone(),
//!     config,
//!     Rc::new(translator),
//!     TranslationCache::in_memory(),
//!     Rc::new(NoopHooks),
//! );
//!
//! // 整页翻译，随后开始观察变更
//! service.translate().await;
//!
//! // 文档变化时转交变更记录
//! service.handle_mutations(vec![MutationRecord::ChildInserted(node)]).await;
//!
//! let stats = service.stats();
//! println!("已翻译 {} 个元素", stats.elements_translated);
//! ```

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{get_parent_node, is_element};
use crate::translation::{
    client::RemoteTranslator,
    config::TranslationConfig,
    error::helpers::log_error,
    storage::TranslationCache,
};

use super::engine::TranslationEngine;
use super::hooks::TranslationHooks;
use super::scheduler::{MutationRecord, MutationScheduler, SchedulerState};

/// 页面翻译服务
///
/// 一个服务实例对应一个文档。它持有：
///
/// - **翻译引擎**: 负责一次具体的扫描与写回
/// - **变更调度器**: 维护待处理集合与"观察 / 排空 / 整页"状态
/// - **统计信息**: 与引擎、片段解析器共享的原子计数器
///
/// ## 生命周期
///
/// 1. `new` 创建后处于 `Idle` 状态，不观察变更
/// 2. `translate` / `translate_page` 执行整页翻译
/// 3. `start_observing` 之后，`handle_mutations` 收到的变更会被增量处理
/// 4. `destroy` 停止观察、清空待处理集合，之后才到达的翻译结果一律丢弃
pub struct TranslationService {
    /// 翻译引擎
    ///
    /// 配置、翻译客户端、缓存与钩子都由引擎持有，服务通过它访问。
    engine: TranslationEngine,

    /// 变更调度器
    ///
    /// 只记录状态，不执行翻译；所有状态转换都在本服务中发生。
    scheduler: MutationScheduler,

    /// 服务统计信息
    ///
    /// 与引擎共享同一份计数器，`stats()` 返回其快照。
    stats: Rc<ServiceStats>,
}

impl TranslationService {
    /// 创建翻译服务
    ///
    /// # 参数
    ///
    /// * `document` - 文档根节点
    /// * `config` - 已校验的会话配置
    /// * `translator` - 远程翻译客户端
    /// * `cache` - 翻译缓存（内存或 redb）
    /// * `hooks` - 生命周期钩子，不需要时传入 `NoopHooks`
    pub fn new(
        document: Handle,
        config: TranslationConfig,
        translator: Rc<dyn RemoteTranslator>,
        cache: TranslationCache,
        hooks: Rc<dyn TranslationHooks>,
    ) -> Self {
        let stats = Rc::new(ServiceStats::default());
        tracing::info!(
            "创建翻译服务: 目标语言 {}，源语言 {}",
            config.target_lang,
            config.source().unwrap_or("自动")
        );

        let engine = TranslationEngine::new(
            document,
            Rc::new(config),
            translator,
            cache,
            hooks,
            stats.clone(),
        );

        Self {
            engine,
            scheduler: MutationScheduler::new(),
            stats,
        }
    }

    /// 会话配置
    pub fn config(&self) -> &TranslationConfig {
        self.engine.config()
    }

    /// 整页翻译；配置了 `auto` 时随后开始观察变更
    ///
    /// 返回本次整页翻译处理的元素数。
    pub async fn translate(&self) -> usize {
        let applied = self.translate_page().await;
        if self.config().auto {
            self.start_observing();
        }
        applied
    }

    /// 整页翻译
    ///
    /// 期间暂停观察变更，结束后恢复到调用前的观察状态。`before` 与 `after`
    /// 钩子总是成对调用，即使翻译过程中出错。已有排空或整页翻译在进行时
    /// 直接返回 0。
    ///
    /// # 错误处理
    ///
    /// 内部错误（例如找不到根节点）只记录日志，不向调用方传播。
    pub async fn translate_page(&self) -> usize {
        if self.engine.is_destroyed() {
            tracing::warn!("翻译服务已销毁，忽略整页翻译请求");
            return 0;
        }

        let was_observing = self.scheduler.is_observing();
        if !self.scheduler.try_begin_full_pass() {
            tracing::warn!("已有翻译任务在进行，忽略整页翻译请求");
            return 0;
        }
        self.scheduler.set_observing(false);

        let hooks = self.engine.hooks();
        hooks.before().await;

        let applied = match self.engine.translate_page().await {
            Ok(applied) => applied,
            Err(e) => {
                log_error(&e);
                0
            }
        };

        hooks.after().await;

        self.stats.record_full_pass();
        self.scheduler.finish();
        if was_observing && !self.engine.is_destroyed() {
            self.scheduler.set_observing(true);
        }

        tracing::info!("整页翻译完成: {} 个元素", applied);
        applied
    }

    /// 开始观察变更；服务销毁后无效
    pub fn start_observing(&self) {
        if self.engine.is_destroyed() {
            tracing::warn!("翻译服务已销毁，不能重新开始观察");
            return;
        }
        self.scheduler.set_observing(true);
        tracing::debug!("开始观察文档变更");
    }

    /// 停止观察变更；已入队的节点保留
    pub fn stop_observing(&self) {
        self.scheduler.set_observing(false);
        tracing::debug!("停止观察文档变更");
    }

    /// 处理一组变更记录
    ///
    /// 记录被分类后加入待处理集合。没有排空在进行时由本次调用负责排空，
    /// 循环直到集合为空；否则只入队，由进行中的排空循环接手。
    /// 未在观察、或整页翻译进行中时，记录被丢弃。
    pub async fn handle_mutations(&self, records: Vec<MutationRecord>) {
        if !self.scheduler.accepts_mutations() {
            tracing::trace!("未在观察变更，丢弃 {} 条记录", records.len());
            return;
        }

        for record in records {
            self.classify(record);
        }

        if !self.scheduler.try_begin_drain() {
            tracing::trace!("排空进行中，{} 个节点等待处理", self.scheduler.pending_len());
            return;
        }

        loop {
            let snapshot = self.scheduler.take_snapshot();
            if snapshot.is_empty() || self.engine.is_destroyed() {
                break;
            }

            self.stats.record_drain();
            tracing::debug!("排空待处理集合: {} 个节点", snapshot.len());
            let applied = self.engine.translate_elements(snapshot).await;
            tracing::debug!("本轮排空写回 {} 个元素", applied);
        }

        self.scheduler.finish();
    }

    /// 把一条变更记录转换为待处理节点
    fn classify(&self, record: MutationRecord) {
        match record {
            MutationRecord::ChildInserted(node) if is_element(&node) => {
                for candidate in self.engine.collect_candidates(&node, true) {
                    self.scheduler.enqueue(candidate);
                }
            }
            MutationRecord::ChildInserted(node) | MutationRecord::TextChanged(node) => {
                self.classify_text(&node);
            }
        }
    }

    /// 文本变化：调度所属元素
    ///
    /// 从所属元素向上找到第一个匹配 force 或 ignore 的元素：匹配 force 则调度，
    /// 只匹配 ignore 则跳过，都没有则调度。
    fn classify_text(&self, node: &Handle) {
        if !matches!(node.data, NodeData::Text { .. }) {
            return;
        }
        let Some(element) = get_parent_node(node).filter(is_element) else {
            return;
        };

        let config = self.engine.config();
        let force = config.force_selector();
        let ignore = config.ignore_selector();

        let mut current = Some(element.clone());
        while let Some(ancestor) = current {
            if force.is_some_and(|f| f.matches(&ancestor)) {
                break;
            }
            if ignore.matches(&ancestor) {
                tracing::trace!("文本变化位于忽略区域，跳过");
                return;
            }
            current = get_parent_node(&ancestor).filter(is_element);
        }

        self.scheduler.enqueue(element);
    }

    /// 销毁服务：停止观察，清空待处理集合，丢弃之后到达的结果
    pub fn destroy(&self) {
        self.scheduler.set_observing(false);
        self.scheduler.clear();
        self.engine.mark_destroyed();
        tracing::info!("翻译服务已销毁");
    }

    /// 调度器当前状态
    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// 待处理节点数
    pub fn pending_len(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// 统计信息快照
    pub fn stats(&self) -> ServiceStatsSnapshot {
        self.stats.snapshot()
    }
}

/// 服务统计信息
///
/// 所有计数器都是原子的，可在引擎、片段解析器与服务之间共享，不需要 `&mut`。
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// 进入提取阶段的元素数
    pub elements_scanned: AtomicU64,

    /// 写回（或标记完成）的元素数
    pub elements_translated: AtomicU64,

    /// 送入解析器的去重片段数
    pub fragments_resolved: AtomicU64,

    /// 词典命中次数
    pub dictionary_hits: AtomicU64,

    /// 缓存命中次数
    pub cache_hits: AtomicU64,

    /// 缓存未命中次数
    pub cache_misses: AtomicU64,

    /// 远程批量请求次数
    pub network_requests: AtomicU64,

    /// 失败（回退原文）的远程批量请求次数
    pub network_failures: AtomicU64,

    /// 排空轮数
    pub drains: AtomicU64,

    /// 整页翻译次数
    pub full_passes: AtomicU64,
}

impl ServiceStats {
    pub fn record_elements_scanned(&self, count: usize) {
        self.elements_scanned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_element_translated(&self) {
        self.elements_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fragments_resolved(&self, count: usize) {
        self.fragments_resolved.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dictionary_hit(&self) {
        self.dictionary_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_request(&self) {
        self.network_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_failure(&self) {
        self.network_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_full_pass(&self) {
        self.full_passes.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计信息快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            elements_scanned: self.elements_scanned.load(Ordering::Relaxed),
            elements_translated: self.elements_translated.load(Ordering::Relaxed),
            fragments_resolved: self.fragments_resolved.load(Ordering::Relaxed),
            dictionary_hits: self.dictionary_hits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_requests: self.network_requests.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            full_passes: self.full_passes.load(Ordering::Relaxed),
        }
    }
}

/// 统计信息快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub elements_scanned: u64,
    pub elements_translated: u64,
    pub fragments_resolved: u64,
    pub dictionary_hits: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_requests: u64,
    pub network_failures: u64,
    pub drains: u64,
    pub full_passes: u64,
}

impl ServiceStatsSnapshot {
    /// 缓存命中率（词典命中不计入）
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
