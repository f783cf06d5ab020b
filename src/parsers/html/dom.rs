//! 基础DOM操作
//!
//! 文档树协作者的具体实现：解析、序列化、属性与标记类的读写、
//! 父子关系查询以及供变更通知使用的节点插入/文本修改。

use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{namespace_url, ns};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::translation::error::{TranslationError, TranslationResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> TranslationResult<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| TranslationError::ParseError(format!("HTML解析失败: {}", e)))
}

/// 将节点的子节点序列化为 HTML 字符串（对文档节点即整个文档）
pub fn serialize_node(node: &Handle) -> TranslationResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| TranslationError::SerializationError(format!("HTML序列化失败: {}", e)))?;

    String::from_utf8(buf)
        .map_err(|e| TranslationError::SerializationError(format!("UTF-8转换失败: {}", e)))
}

/// 节点身份标识（同一节点在其生命周期内保持不变）
pub fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as *const () as usize
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 设置节点属性
///
/// `attr_value` 为 `None` 时移除该属性。
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    use html5ever::interface::{Attribute, QualName};
    use html5ever::tendril::format_tendril;
    use html5ever::LocalName;

    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.as_deref() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 检查元素是否带有指定的类
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

/// 为元素添加类（已存在则不变）
pub fn add_class(node: &Handle, class_name: &str) {
    if !is_element(node) || has_class(node, class_name) {
        return;
    }

    let classes = match get_node_attr(node, "class") {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{} {}", existing.trim(), class_name)
        }
        _ => class_name.to_string(),
    };
    set_node_attr(node, "class", Some(classes));
}

/// 从元素上移除类
pub fn remove_class(node: &Handle, class_name: &str) {
    let Some(existing) = get_node_attr(node, "class") else {
        return;
    };

    let remaining: Vec<&str> = existing
        .split_whitespace()
        .filter(|c| *c != class_name)
        .collect();
    if remaining.is_empty() {
        set_node_attr(node, "class", None);
    } else {
        set_node_attr(node, "class", Some(remaining.join(" ")));
    }
}

/// 获取父节点
///
/// 读取后会把弱引用放回，不改变树结构。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 返回直接子元素
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

/// 返回直接文本子节点（不包含嵌套元素内的文本）
pub fn direct_text_nodes(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Text { .. }))
        .cloned()
        .collect()
}

/// 读取文本节点内容
pub fn get_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆盖文本节点内容
pub fn set_text(node: &Handle, value: &str) {
    if let NodeData::Text { contents } = &node.data {
        let mut contents = contents.borrow_mut();
        contents.clear();
        contents.push_slice(value);
    }
}

/// 拼接子树中的全部文本
pub fn text_content(node: &Handle) -> String {
    let mut result = String::new();
    let mut stack = vec![node.clone()];

    while let Some(current) = stack.pop() {
        if let NodeData::Text { contents } = &current.data {
            result.push_str(&contents.borrow());
        }
        for child in current.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    result
}

/// 节点是否仍挂在给定文档之下
pub fn is_connected(node: &Handle, document: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if Rc::ptr_eq(&n, document) {
            return true;
        }
        current = get_parent_node(&n);
    }
    false
}

/// 将节点从原父节点摘下
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 追加子节点（会先从原位置摘下）
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 从 HTML 片段创建游离节点，用于向活动文档中注入新内容
pub fn create_nodes(html: &str) -> TranslationResult<Vec<Handle>> {
    let markup = format!("<!DOCTYPE html><html><head></head><body>{}</body></html>", html);
    let dom = html_to_dom(markup.as_bytes(), "utf-8")?;

    let body = find_first_element(&dom.document, "body")
        .ok_or_else(|| TranslationError::ParseError("HTML片段缺少body".to_string()))?;

    let nodes: Vec<Handle> = body.children.borrow_mut().drain(..).collect();
    for node in &nodes {
        node.parent.set(None);
    }

    Ok(nodes)
}

/// 按标签名查找第一个元素（深度优先，文档顺序）
pub fn find_first_element(node: &Handle, tag_name: &str) -> Option<Handle> {
    let mut stack = vec![node.clone()];

    while let Some(current) = stack.pop() {
        if get_node_name(&current).is_some_and(|name| name.eq_ignore_ascii_case(tag_name)) {
            return Some(current);
        }
        for child in current.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").expect("parse")
    }

    #[test]
    fn test_class_markers() {
        let dom = dom("<p class=\"lead\">Hi</p>");
        let p = find_first_element(&dom.document, "p").unwrap();

        add_class(&p, "done");
        add_class(&p, "done");
        assert_eq!(get_node_attr(&p, "class").as_deref(), Some("lead done"));

        remove_class(&p, "lead");
        assert!(has_class(&p, "done"));
        assert!(!has_class(&p, "lead"));

        remove_class(&p, "done");
        assert_eq!(get_node_attr(&p, "class"), None);
    }

    #[test]
    fn test_parent_lookup_is_non_destructive() {
        let dom = dom("<div><span>x</span></div>");
        let span = find_first_element(&dom.document, "span").unwrap();

        let first = get_parent_node(&span).unwrap();
        let second = get_parent_node(&span).unwrap();
        assert_eq!(get_node_name(&first), Some("div"));
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_create_and_append_nodes() {
        let dom = dom("<div id=\"host\"></div>");
        let host = find_first_element(&dom.document, "div").unwrap();

        let nodes = create_nodes("<p>Fresh <b>news</b></p>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(!is_connected(&nodes[0], &dom.document));

        append_child(&host, &nodes[0]);
        assert!(is_connected(&nodes[0], &dom.document));
        assert_eq!(text_content(&host), "Fresh news");

        let html = serialize_node(&host).unwrap();
        assert!(html.contains("<p>Fresh <b>news</b></p>"));
    }

    #[test]
    fn test_set_text_and_direct_text_nodes() {
        let dom = dom("<p>Hello <b>world</b> again</p>");
        let p = find_first_element(&dom.document, "p").unwrap();

        let runs = direct_text_nodes(&p);
        assert_eq!(runs.len(), 2);
        set_text(&runs[1], " encore");
        assert_eq!(text_content(&p), "Hello world encore");
    }
}
