//! 节点过滤器模块
//!
//! 扫描时对每个元素给出三种决定之一：接受、跳过但继续下探、拒绝并剪掉整棵子树。
//! 判定顺序（先命中者生效）：
//!
//! 1. 已带完成标记 → 跳过
//! 2. 自身匹配 force → 接受
//! 3. 祖先匹配 force → 接受
//! 4. 某个后代匹配 force → 跳过（把接受留给该后代）
//! 5. 自身或祖先匹配 ignore → 拒绝
//! 6. 其余 → 接受

use std::collections::HashSet;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{get_parent_node, has_class, is_element, node_key};
use crate::parsers::html::selector::SelectorList;
use crate::translation::config::TranslationConfig;

/// 单个节点的过滤结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeDecision {
    /// 收集该节点并继续遍历子节点
    Accept,
    /// 不收集，但继续遍历子节点
    Skip,
    /// 不收集，也不遍历子节点
    Reject,
}

/// 过滤上下文：过滤函数所需的全部状态都显式放在这里
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub force: Option<&'a SelectorList>,
    pub ignore: &'a SelectorList,
    pub done_class: &'a str,
    /// 含有 force 后代的元素；`None` 时退回逐节点的后代查询
    forced_ancestors: Option<HashSet<usize>>,
}

impl<'a> FilterContext<'a> {
    pub fn new(force: Option<&'a SelectorList>, ignore: &'a SelectorList, done_class: &'a str) -> Self {
        Self {
            force,
            ignore,
            done_class,
            forced_ancestors: None,
        }
    }

    pub fn from_config(config: &'a TranslationConfig) -> Self {
        Self::new(
            config.force_selector(),
            config.ignore_selector(),
            &config.done_class,
        )
    }

    /// 预先标出 `root` 子树内所有 force 节点的祖先（止于 `root`），
    /// 使第 4 步成为一次集合查询
    pub fn prepare(&mut self, root: &Handle) {
        let Some(force) = self.force else {
            self.forced_ancestors = None;
            return;
        };

        let root_key = node_key(root);
        let mut marked = HashSet::new();
        let mut stack = vec![root.clone()];

        while let Some(node) = stack.pop() {
            if node_key(&node) != root_key && force.matches(&node) {
                let mut current = get_parent_node(&node);
                while let Some(ancestor) = current {
                    let key = node_key(&ancestor);
                    if !marked.insert(key) || key == root_key {
                        break;
                    }
                    current = get_parent_node(&ancestor);
                }
            }
            for child in node.children.borrow().iter() {
                if is_element(child) {
                    stack.push(child.clone());
                }
            }
        }

        self.forced_ancestors = Some(marked);
    }

    fn has_forced_descendant(&self, force: &SelectorList, node: &Handle) -> bool {
        match &self.forced_ancestors {
            Some(marked) => marked.contains(&node_key(node)),
            None => force.query_any(node),
        }
    }
}

/// 对单个节点做出过滤决定
pub fn decide(node: &Handle, ctx: &FilterContext<'_>) -> NodeDecision {
    if !is_element(node) {
        return NodeDecision::Skip;
    }

    if has_class(node, ctx.done_class) {
        return NodeDecision::Skip;
    }

    if let Some(force) = ctx.force {
        if force.matches(node) || force.matches_ancestor(node) {
            return NodeDecision::Accept;
        }
        if ctx.has_forced_descendant(force, node) {
            return NodeDecision::Skip;
        }
    }

    if ctx.ignore.matches(node) || ctx.ignore.matches_ancestor(node) {
        return NodeDecision::Reject;
    }

    NodeDecision::Accept
}

/// 先序遍历 `root` 下的元素，按文档顺序返回被接受的节点
///
/// `include_root` 为假时根节点本身不参与判定（整页翻译），
/// 为真时根节点与后代一样接受判定（新插入的子树）。
pub fn scan(root: &Handle, ctx: &FilterContext<'_>, include_root: bool) -> Vec<Handle> {
    let mut accepted = Vec::new();
    let mut stack: Vec<Handle> = if include_root {
        vec![root.clone()]
    } else {
        root.children.borrow().iter().rev().cloned().collect()
    };

    while let Some(node) = stack.pop() {
        if !is_element(&node) {
            continue;
        }

        let decision = decide(&node, ctx);
        tracing::trace!("节点过滤: {:?}", decision);

        match decision {
            NodeDecision::Reject => continue,
            NodeDecision::Accept => accepted.push(node.clone()),
            NodeDecision::Skip => {}
        }

        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    accepted
}
