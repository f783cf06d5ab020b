//! 翻译管道模块
//!
//! 按处理顺序：过滤扫描 → 文本提取 → 术语拆分 → 片段解析 → 译文回写

pub mod batch;
pub mod collector;
pub mod filters;
pub mod redistribute;
pub mod terms;

// 重新导出主要类型
pub use batch::FragmentResolver;
pub use collector::{direct_text_runs, extract_text, TextRun};
pub use filters::{decide, scan, FilterContext, NodeDecision};
pub use redistribute::{redistribute, slice_lengths};
pub use terms::split_by_terms;
