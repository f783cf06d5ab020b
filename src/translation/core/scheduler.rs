//! 变更调度器
//!
//! 维护待翻译节点集合，以及"观察 / 排空 / 整页翻译"三者之间的互斥状态。
//! 调度器本身不做任何翻译，只负责记录状态：
//!
//! - 同一时刻至多一次排空；排空期间到达的变更只入队，由正在进行的排空循环接手
//! - 整页翻译期间暂停观察，此时到达的变更被丢弃（整页翻译会覆盖它们）

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::node_key;

/// 文档变更通知
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 新插入的节点（元素或文本）
    ChildInserted(Handle),
    /// 内容发生变化的文本节点
    TextChanged(Handle),
}

/// 调度器对外可见的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// 未观察变更，也没有进行中的工作
    Idle,
    /// 正在观察变更，没有进行中的工作
    ObservingOnly,
    /// 正在排空待处理集合
    Draining,
    /// 正在进行整页翻译
    FullPass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    None,
    Draining,
    FullPass,
}

/// 待处理集合与状态机
#[derive(Debug)]
pub struct MutationScheduler {
    pending: RefCell<Vec<Handle>>,
    members: RefCell<HashSet<usize>>,
    observing: Cell<bool>,
    activity: Cell<Activity>,
}

impl Default for MutationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationScheduler {
    pub fn new() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            members: RefCell::new(HashSet::new()),
            observing: Cell::new(false),
            activity: Cell::new(Activity::None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.activity.get() {
            Activity::Draining => SchedulerState::Draining,
            Activity::FullPass => SchedulerState::FullPass,
            Activity::None if self.observing.get() => SchedulerState::ObservingOnly,
            Activity::None => SchedulerState::Idle,
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing.get()
    }

    pub fn set_observing(&self, observing: bool) {
        self.observing.set(observing);
    }

    /// 当前是否接收变更通知
    pub fn accepts_mutations(&self) -> bool {
        self.observing.get() && self.activity.get() != Activity::FullPass
    }

    pub fn is_busy(&self) -> bool {
        self.activity.get() != Activity::None
    }

    /// 入队；已在集合中的节点忽略。返回是否新加入
    pub fn enqueue(&self, node: Handle) -> bool {
        if !self.members.borrow_mut().insert(node_key(&node)) {
            return false;
        }
        self.pending.borrow_mut().push(node);
        true
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// 取出当前集合的快照并清空
    pub fn take_snapshot(&self) -> Vec<Handle> {
        self.members.borrow_mut().clear();
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub fn clear(&self) {
        self.members.borrow_mut().clear();
        self.pending.borrow_mut().clear();
    }

    /// 空闲时进入排空状态；已有工作在进行时返回 `false`
    pub fn try_begin_drain(&self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.activity.set(Activity::Draining);
        true
    }

    /// 空闲时进入整页翻译状态；已有工作在进行时返回 `false`
    pub fn try_begin_full_pass(&self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.activity.set(Activity::FullPass);
        true
    }

    pub fn finish(&self) {
        self.activity.set(Activity::None);
    }
}
