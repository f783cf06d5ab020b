//! 翻译系统核心模块
//!
//! 把管道各阶段组合成一个有生命周期的翻译服务。
//!
//! ## 架构
//!
//! - **服务层** (`service.rs`): 对外接口、错误边界、统计信息
//! - **调度层** (`scheduler.rs`): 待处理集合与"观察 / 排空 / 整页"互斥状态
//! - **引擎层** (`engine.rs`): 扫描、提取、解析、回写
//! - **钩子** (`hooks.rs`): 调用方介入翻译过程的入口
//!
//! ```text
//! TranslationService (service.rs)
//!     ├── MutationScheduler (scheduler.rs)
//!     └── TranslationEngine (engine.rs)
//!             ├── FilterContext / scan (pipeline/filters.rs)
//!             ├── extract_text (pipeline/collector.rs)
//!             ├── FragmentResolver (pipeline/batch.rs)
//!             │       ├── split_by_terms (pipeline/terms.rs)
//!             │       ├── TranslationCache (storage/cache.rs)
//!             │       └── RemoteTranslator (client/)
//!             └── redistribute (pipeline/redistribute.rs)
//! ```

pub mod engine;
pub mod hooks;
pub mod scheduler;
pub mod service;

/// 翻译引擎 - 一次扫描与写回
pub use engine::TranslationEngine;

/// 生命周期钩子
pub use hooks::{NoopHooks, TranslationHooks};

/// 变更记录与调度状态
pub use scheduler::{MutationRecord, MutationScheduler, SchedulerState};

/// 翻译服务 - 主要的对外接口
pub use service::{ServiceStats, ServiceStatsSnapshot, TranslationService};
