//! 文本提取模块
//!
//! 只读取元素的直接文本子节点，嵌套元素中的文本由扫描器作为独立节点处理。

use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::parsers::html::dom::{direct_text_nodes, get_text};

/// 元素的一段直接文本
#[derive(Debug, Clone)]
pub struct TextRun {
    pub node: Handle,
    /// 去掉首尾空白后的内容
    pub text: String,
    /// 回写时原样恢复的前导空白
    pub leading: String,
    /// 回写时原样恢复的尾随空白
    pub trailing: String,
}

impl TextRun {
    /// 从文本节点构造；空白节点返回 `None`
    pub fn from_node(node: &Handle) -> Option<Self> {
        let raw = get_text(node)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let start = raw.len() - raw.trim_start().len();
        let end = start + trimmed.len();

        Some(Self {
            node: node.clone(),
            text: trimmed.to_string(),
            leading: raw[..start].to_string(),
            trailing: raw[end..].to_string(),
        })
    }

    /// 原文本长度（字符数）
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// 收集元素的非空直接文本
pub fn direct_text_runs(element: &Handle) -> Vec<TextRun> {
    direct_text_nodes(element)
        .iter()
        .filter_map(TextRun::from_node)
        .collect()
}

fn symbols_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\s\d\p{P}\p{S}]+$").expect("内置正则表达式有效"))
}

fn has_letter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{L}").expect("内置正则表达式有效"))
}

/// 规范化后的可翻译文本
///
/// 直接文本去首尾空白后以单个空格连接。为空，或只由空白、数字、标点、符号组成时返回 `None`
/// （分隔符、数字角标、图标字符等不送去翻译）。
pub fn extract_text(element: &Handle) -> Option<String> {
    let joined = direct_text_runs(element)
        .into_iter()
        .map(|run| run.text)
        .collect::<Vec<_>>()
        .join(" ");
    let text = joined.trim();

    if text.is_empty() {
        return None;
    }

    if symbols_only().is_match(text) && !has_letter().is_match(text) {
        return None;
    }

    Some(text.to_string())
}
