//! 配置构建器与分层加载
//!
//! `TranslationConfig` 一经构建即不可变，只能通过 `ConfigBuilder` 按选项名逐项合并并校验后得到。
//! `ConfigManager` 依次叠加：内置默认值 → 第一个存在的 TOML 配置文件 → `.env` → `PAGELINGO_*` 环境变量。

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use super::constants;
use super::dictionary::{DictEntry, ManualDictionary, TermTable};
use crate::parsers::html::selector::SelectorList;
use crate::translation::error::{TranslationError, TranslationResult};

/// 远程翻译服务配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub auth_url: String,
    pub api_url: String,
    pub token_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auth_url: constants::DEFAULT_AUTH_URL.to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),
            token_ttl: constants::DEFAULT_TOKEN_TTL,
            request_timeout: constants::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// 会话级翻译配置（不可变）
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub target_lang: String,
    /// 为空表示自动识别
    pub source_lang: String,
    pub root: String,
    pub force: Vec<String>,
    /// 已与默认忽略集合并去重
    pub ignore: Vec<String>,
    pub done_class: String,
    pub pending_class: String,
    pub auto: bool,
    pub batch_size: usize,
    pub translate_runs_separately: bool,
    pub manual_dict: ManualDictionary,
    pub service: ServiceConfig,
    pub cache_path: Option<PathBuf>,

    root_selector: SelectorList,
    force_selector: Option<SelectorList>,
    ignore_selector: SelectorList,
    terms: TermTable,
}

impl TranslationConfig {
    pub fn builder(target_lang: &str) -> ConfigBuilder {
        ConfigBuilder::new().target_lang(target_lang)
    }

    pub fn root_selector(&self) -> &SelectorList {
        &self.root_selector
    }

    pub fn force_selector(&self) -> Option<&SelectorList> {
        self.force_selector.as_ref()
    }

    pub fn ignore_selector(&self) -> &SelectorList {
        &self.ignore_selector
    }

    /// 目标语言的术语表
    pub fn terms(&self) -> &TermTable {
        &self.terms
    }

    /// 源语言（空字符串视为自动识别）
    pub fn source(&self) -> Option<&str> {
        if self.source_lang.is_empty() {
            None
        } else {
            Some(self.source_lang.as_str())
        }
    }
}

/// 配置文件结构（所有字段可选，按名合并）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigFile {
    pub target_lang: Option<String>,
    pub source_lang: Option<String>,
    pub root: Option<String>,
    pub force: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
    pub done_class: Option<String>,
    pub pending_class: Option<String>,
    pub auto: Option<bool>,
    pub batch_size: Option<usize>,
    pub translate_runs_separately: Option<bool>,
    pub manual_dict: Option<ManualDictionary>,
    pub service: Option<ServiceFile>,
    pub cache_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceFile {
    pub auth_url: Option<String>,
    pub api_url: Option<String>,
    pub token_ttl_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn from_toml_str(content: &str) -> TranslationResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> TranslationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| e.with_context(path.display()))
    }
}

/// 环境变量覆盖项（扁平键）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct EnvOverrides {
    target_lang: Option<String>,
    source_lang: Option<String>,
    root: Option<String>,
    force: Option<Vec<String>>,
    ignore: Option<Vec<String>>,
    done_class: Option<String>,
    pending_class: Option<String>,
    auto: Option<bool>,
    batch_size: Option<usize>,
    translate_runs_separately: Option<bool>,
    auth_url: Option<String>,
    api_url: Option<String>,
    token_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    cache_path: Option<String>,
}

/// 配置构建器
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    target_lang: String,
    source_lang: String,
    root: String,
    force: Vec<String>,
    ignore: Vec<String>,
    done_class: String,
    pending_class: String,
    auto: bool,
    batch_size: usize,
    translate_runs_separately: bool,
    manual_dict: ManualDictionary,
    service: ServiceConfig,
    cache_path: Option<PathBuf>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            target_lang: String::new(),
            source_lang: String::new(),
            root: constants::DEFAULT_ROOT_SELECTOR.to_string(),
            force: Vec::new(),
            ignore: Vec::new(),
            done_class: constants::DEFAULT_DONE_CLASS.to_string(),
            pending_class: constants::DEFAULT_PENDING_CLASS.to_string(),
            auto: false,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            translate_runs_separately: false,
            manual_dict: ManualDictionary::new(),
            service: ServiceConfig::default(),
            cache_path: None,
        }
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_lang(mut self, lang: &str) -> Self {
        self.target_lang = lang.trim().to_string();
        self
    }

    pub fn source_lang(mut self, lang: &str) -> Self {
        self.source_lang = lang.trim().to_string();
        self
    }

    pub fn root(mut self, selector: &str) -> Self {
        self.root = selector.to_string();
        self
    }

    pub fn force<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_force(mut self, selector: &str) -> Self {
        self.force.push(selector.to_string());
        self
    }

    /// 自定义忽略选择器（构建时总会并入默认集合）
    pub fn ignore<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_ignore(mut self, selector: &str) -> Self {
        self.ignore.push(selector.to_string());
        self
    }

    pub fn done_class(mut self, class: &str) -> Self {
        self.done_class = class.trim().to_string();
        self
    }

    pub fn pending_class(mut self, class: &str) -> Self {
        self.pending_class = class.trim().to_string();
        self
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn translate_runs_separately(mut self, enabled: bool) -> Self {
        self.translate_runs_separately = enabled;
        self
    }

    /// 合并词典（同语言同术语以新值为准）
    pub fn manual_dict(mut self, dict: ManualDictionary) -> Self {
        self.manual_dict.merge(dict);
        self
    }

    pub fn dict_entry(mut self, lang: &str, term: &str, entry: DictEntry) -> Self {
        self.manual_dict.insert(lang, term, entry);
        self
    }

    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.service = service;
        self
    }

    pub fn auth_url(mut self, url: &str) -> Self {
        self.service.auth_url = url.to_string();
        self
    }

    pub fn api_url(mut self, url: &str) -> Self {
        self.service.api_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.service.token_ttl = ttl;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.service.request_timeout = timeout;
        self
    }

    pub fn cache_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// 合并配置文件中出现的选项
    pub fn apply_file(mut self, file: ConfigFile) -> Self {
        if let Some(v) = file.target_lang {
            self = self.target_lang(&v);
        }
        if let Some(v) = file.source_lang {
            self = self.source_lang(&v);
        }
        if let Some(v) = file.root {
            self = self.root(&v);
        }
        if let Some(v) = file.force {
            self = self.force(v);
        }
        if let Some(v) = file.ignore {
            self = self.ignore(v);
        }
        if let Some(v) = file.done_class {
            self = self.done_class(&v);
        }
        if let Some(v) = file.pending_class {
            self = self.pending_class(&v);
        }
        if let Some(v) = file.auto {
            self = self.auto(v);
        }
        if let Some(v) = file.batch_size {
            self = self.batch_size(v);
        }
        if let Some(v) = file.translate_runs_separately {
            self = self.translate_runs_separately(v);
        }
        if let Some(v) = file.manual_dict {
            self = self.manual_dict(v);
        }
        if let Some(service) = file.service {
            if let Some(v) = service.auth_url {
                self = self.auth_url(&v);
            }
            if let Some(v) = service.api_url {
                self = self.api_url(&v);
            }
            if let Some(v) = service.token_ttl_secs {
                self = self.token_ttl(Duration::from_secs(v));
            }
            if let Some(v) = service.request_timeout_secs {
                self = self.request_timeout(Duration::from_secs(v));
            }
        }
        if let Some(v) = file.cache_path {
            self = self.cache_path(shellexpand::tilde(&v).into_owned());
        }
        self
    }

    fn apply_env(mut self, env: EnvOverrides) -> Self {
        if let Some(v) = env.target_lang {
            tracing::info!("环境变量覆盖目标语言: {}", v);
            self = self.target_lang(&v);
        }
        if let Some(v) = env.source_lang {
            self = self.source_lang(&v);
        }
        if let Some(v) = env.root {
            self = self.root(&v);
        }
        if let Some(v) = env.force {
            self = self.force(v.into_iter().filter(|s| !s.trim().is_empty()));
        }
        if let Some(v) = env.ignore {
            self = self.ignore(v.into_iter().filter(|s| !s.trim().is_empty()));
        }
        if let Some(v) = env.done_class {
            self = self.done_class(&v);
        }
        if let Some(v) = env.pending_class {
            self = self.pending_class(&v);
        }
        if let Some(v) = env.auto {
            self = self.auto(v);
        }
        if let Some(v) = env.batch_size {
            self = self.batch_size(v);
        }
        if let Some(v) = env.translate_runs_separately {
            self = self.translate_runs_separately(v);
        }
        if let Some(v) = env.auth_url {
            self = self.auth_url(&v);
        }
        if let Some(v) = env.api_url {
            tracing::info!("环境变量覆盖 API URL: {}", v);
            self = self.api_url(&v);
        }
        if let Some(v) = env.token_ttl_secs {
            self = self.token_ttl(Duration::from_secs(v));
        }
        if let Some(v) = env.request_timeout_secs {
            self = self.request_timeout(Duration::from_secs(v));
        }
        if let Some(v) = env.cache_path {
            self = self.cache_path(shellexpand::tilde(&v).into_owned());
        }
        self
    }

    /// 校验并生成不可变配置
    pub fn build(self) -> TranslationResult<TranslationConfig> {
        if self.target_lang.is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.batch_size == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.done_class.is_empty() || self.pending_class.is_empty() {
            return Err(TranslationError::ConfigError("标记类名不能为空".to_string()));
        }

        if self.done_class == self.pending_class {
            return Err(TranslationError::ConfigError(format!(
                "完成标记与处理中标记不能相同: {}",
                self.done_class
            )));
        }

        if self.service.token_ttl.is_zero() {
            return Err(TranslationError::ConfigError("令牌有效期不能为0".to_string()));
        }

        let force = dedup(self.force.into_iter());
        let ignore = dedup(
            constants::DEFAULT_IGNORE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .chain(self.ignore),
        );

        let root_selector = SelectorList::parse(&self.root)?;
        let force_selector = SelectorList::from_selectors(&force)?;
        let ignore_selector = SelectorList::from_selectors(&ignore)?.ok_or_else(|| {
            TranslationError::InternalError("忽略选择器集合不应为空".to_string())
        })?;
        let terms = self.manual_dict.for_language(&self.target_lang)?;

        tracing::debug!(
            "配置已构建 - 目标语言: {}, 强制选择器: {}, 忽略选择器: {}, 词典术语: {}",
            self.target_lang,
            force.len(),
            ignore.len(),
            terms.len()
        );

        Ok(TranslationConfig {
            target_lang: self.target_lang,
            source_lang: self.source_lang,
            root: self.root,
            force,
            ignore,
            done_class: self.done_class,
            pending_class: self.pending_class,
            auto: self.auto,
            batch_size: self.batch_size,
            translate_runs_separately: self.translate_runs_separately,
            manual_dict: self.manual_dict,
            service: self.service,
            cache_path: self.cache_path,
            root_selector,
            force_selector,
            ignore_selector,
            terms,
        })
    }
}

/// 去掉空白项并保序去重
fn dedup(selectors: impl Iterator<Item = String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for selector in selectors {
        let selector = selector.trim().to_string();
        if !selector.is_empty() && !result.contains(&selector) {
            result.push(selector);
        }
    }
    result
}

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    search_paths: Vec<String>,
    env_source: Option<config::Map<String, String>>,
    load_dotenv: bool,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// 使用默认搜索路径与进程环境变量
    pub fn new() -> Self {
        Self {
            search_paths: constants::CONFIG_PATHS.iter().map(|s| s.to_string()).collect(),
            env_source: None,
            load_dotenv: true,
        }
    }

    pub fn with_search_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// 用给定的键值表代替进程环境变量（同时跳过 `.env` 加载）
    pub fn with_env_source(mut self, vars: config::Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self.load_dotenv = false;
        self
    }

    /// 加载并构建配置
    pub fn load(&self) -> TranslationResult<TranslationConfig> {
        self.builder()?.build()
    }

    /// 加载各层配置，返回尚未校验的构建器，调用方可继续追加代码级选项
    pub fn builder(&self) -> TranslationResult<ConfigBuilder> {
        let mut builder = ConfigBuilder::new();

        if let Some(path) = self.find_config_file() {
            tracing::info!("加载配置文件: {}", path.display());
            builder = builder.apply_file(ConfigFile::from_path(&path)?);
        }

        if self.load_dotenv {
            Self::load_dotenv();
        }

        let overrides = self.env_overrides()?;
        Ok(builder.apply_env(overrides))
    }

    /// 搜索路径中第一个存在的配置文件
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).into_owned()))
            .find(|path| path.is_file())
    }

    fn env_overrides(&self) -> TranslationResult<EnvOverrides> {
        let environment = Environment::with_prefix(constants::ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("force")
            .with_list_parse_key("ignore")
            .source(self.env_source.clone());

        let overrides = Config::builder()
            .add_source(environment)
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("读取环境变量失败: {}", e)))?
            .try_deserialize::<EnvOverrides>()
            .map_err(|e| TranslationError::ConfigError(format!("环境变量格式错误: {}", e)))?;

        Ok(overrides)
    }

    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() {
                match dotenv::from_filename(env_file) {
                    Ok(_) => {
                        tracing::info!("已加载环境变量文件: {}", env_file);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("无法加载环境变量文件 {}: {}", env_file, e);
                    }
                }
            }
        }
    }
}
