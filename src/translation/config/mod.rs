//! 翻译配置管理模块
//!
//! 提供配置构建、校验与分层加载（默认值、配置文件、环境变量）

pub mod dictionary;
pub mod manager;

// 重新导出主要类型
pub use dictionary::{DictEntry, ManualDictionary, SplitTerm, TermTable};
pub use manager::{ConfigBuilder, ConfigFile, ConfigManager, ServiceConfig, TranslationConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 100;

    // 文档范围
    pub const DEFAULT_ROOT_SELECTOR: &str = "body";

    // 标记类
    pub const DEFAULT_DONE_CLASS: &str = "pagelingo-done";
    pub const DEFAULT_PENDING_CLASS: &str = "pagelingo-pending";

    // 始终生效的忽略选择器
    pub const DEFAULT_IGNORE_SELECTORS: &[&str] = &[
        "style",
        "script",
        "noscript",
        "code",
        "pre",
        "input",
        "textarea",
        "[contenteditable=\"true\"]",
        ".pagelingo-ignore",
    ];

    // 翻译服务
    pub const DEFAULT_AUTH_URL: &str = "https://edge.microsoft.com/translate/auth";
    pub const DEFAULT_API_URL: &str = "https://api.cognitive.microsofttranslator.com";
    pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    // 内存缓存
    pub const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 10_000;

    // 环境变量前缀
    pub const ENV_PREFIX: &str = "PAGELINGO";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "pagelingo.toml",
        ".pagelingo.toml",
        "~/.config/pagelingo/config.toml",
    ];

    // .env 文件，按优先级排列
    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}
