//! HTML 处理模块
//!
//! - `dom`: 基于 `markup5ever_rcdom` 的节点操作
//! - `selector`: CSS 选择器子集的解析与匹配

pub mod dom;
pub mod selector;

pub use dom::{html_to_dom, serialize_node};
pub use selector::SelectorList;
