//! 术语拆分
//!
//! 把候选文本按手动词典中的非独立术语切开，术语片段由词典直接解析，其余片段照常翻译，
//! 解析后按原顺序无分隔符拼接。

use crate::translation::config::TermTable;

/// 按术语拆分文本
///
/// - 整段文本等于某个独立术语时不拆分；
/// - 不包含任何非独立术语时不拆分；
/// - 否则反复寻找最早出现、且两端落在词边界上的术语（同一位置取最长者），
///   切成 [前缀, 术语, 剩余]，再处理剩余部分。
pub fn split_by_terms(text: &str, terms: &TermTable) -> Vec<String> {
    if terms.is_empty() || text.is_empty() || terms.is_standalone_term(text) {
        return vec![text.to_string()];
    }

    if !terms.split_terms().iter().any(|term| term.contained_in(text)) {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        match find_term(rest, terms) {
            Some((start, end)) => {
                if start > 0 {
                    parts.push(rest[..start].to_string());
                }
                parts.push(rest[start..end].to_string());
                rest = &rest[end..];
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }

    parts
}

/// 第一个满足词边界的术语出现位置（字节区间）
fn find_term(text: &str, terms: &TermTable) -> Option<(usize, usize)> {
    let mut from = 0;

    while let Some(start) = terms.next_candidate(text, from) {
        let tail = &text[start..];
        for term in terms.split_terms() {
            if let Some(len) = term.match_len(tail) {
                let end = start + len;
                if len > 0 && on_boundary(text, start, end) {
                    return Some((start, end));
                }
            }
        }

        from = start + tail.chars().next().map_or(1, char::len_utf8);
        if from > text.len() {
            break;
        }
    }

    None
}

/// 术语两端不得与相邻字符同属字母或同属数字
fn on_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let first = text[start..end].chars().next();
    let last = text[start..end].chars().next_back();
    let after = text[end..].chars().next();

    !joins(before, first) && !joins(last, after)
}

fn joins(a: Option<char>, b: Option<char>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            (a.is_alphabetic() && b.is_alphabetic()) || (a.is_numeric() && b.is_numeric())
        }
        _ => false,
    }
}
