//! # 解析器模块
//!
//! - `html` - HTML 文档解析、DOM 操作与选择器匹配

pub mod html;

pub use html::{html_to_dom, serialize_node, SelectorList};
