//! 手动词典
//!
//! 语言 -> 术语 -> 词条。`"*"` 语言桶中的词条作为所有语言的默认值，
//! 同名术语可被具体语言覆盖。

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};

/// 对所有目标语言生效的词典桶
pub const ALL_LANGUAGES: &str = "*";

/// 词典条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDictEntry")]
pub struct DictEntry {
    /// 译文
    pub to: String,
    /// 为真时只有整段文本等于该术语才匹配；为假时可作为子串拆分
    pub standalone: bool,
    /// 为真时区分大小写
    pub case: bool,
}

impl DictEntry {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            standalone: true,
            case: true,
        }
    }

    pub fn standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    pub fn case_sensitive(mut self, case: bool) -> Self {
        self.case = case;
        self
    }
}

/// 配置文件中的词条写法：纯字符串，或带标志的表
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawDictEntry {
    Plain(String),
    Detailed {
        to: String,
        standalone: Option<bool>,
        case: Option<bool>,
    },
}

impl From<RawDictEntry> for DictEntry {
    fn from(raw: RawDictEntry) -> Self {
        match raw {
            RawDictEntry::Plain(to) => DictEntry::new(to),
            RawDictEntry::Detailed {
                to,
                standalone,
                case,
            } => DictEntry {
                to,
                standalone: standalone.unwrap_or(true),
                case: case.unwrap_or(true),
            },
        }
    }
}

/// 按语言分组的手动词典
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualDictionary {
    languages: BTreeMap<String, BTreeMap<String, DictEntry>>,
}

impl ManualDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lang: &str, term: &str, entry: DictEntry) {
        self.languages
            .entry(lang.to_string())
            .or_default()
            .insert(term.to_string(), entry);
    }

    pub fn with_entry(mut self, lang: &str, term: &str, entry: DictEntry) -> Self {
        self.insert(lang, term, entry);
        self
    }

    /// 将另一个词典合并进来，同语言同术语以 `other` 为准
    pub fn merge(&mut self, other: ManualDictionary) {
        for (lang, terms) in other.languages {
            self.languages.entry(lang).or_default().extend(terms);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.languages.values().all(|terms| terms.is_empty())
    }

    /// 生成目标语言的术语表（`"*"` 桶作为默认值）
    pub fn for_language(&self, lang: &str) -> TranslationResult<TermTable> {
        let mut merged: BTreeMap<String, DictEntry> = BTreeMap::new();
        if let Some(defaults) = self.languages.get(ALL_LANGUAGES) {
            merged.extend(defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if lang != ALL_LANGUAGES {
            if let Some(specific) = self.languages.get(lang) {
                merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        TermTable::build(merged)
    }
}

/// 可拆分（非独立）术语及其锚定匹配器
#[derive(Debug, Clone)]
pub struct SplitTerm {
    pub term: String,
    pub entry: DictEntry,
    anchored: Regex,
}

impl SplitTerm {
    /// 若文本以该术语开头，返回匹配的字节长度
    pub fn match_len(&self, text: &str) -> Option<usize> {
        self.anchored.find(text).map(|m| m.end())
    }

    /// 子串包含测试（遵循大小写标志）
    pub fn contained_in(&self, text: &str) -> bool {
        if self.entry.case {
            text.contains(&self.term)
        } else {
            text.to_lowercase().contains(&self.term.to_lowercase())
        }
    }
}

/// 单一目标语言的已编译术语表
#[derive(Debug, Clone, Default)]
pub struct TermTable {
    entries: HashMap<String, DictEntry>,
    /// 小写术语 -> 不区分大小写的词条
    folded: HashMap<String, DictEntry>,
    /// 非独立术语，按长度降序
    split_terms: Vec<SplitTerm>,
    /// 所有非独立术语的组合匹配器，用于快速定位候选位置
    any_term: Option<Regex>,
}

impl TermTable {
    fn build(entries: BTreeMap<String, DictEntry>) -> TranslationResult<Self> {
        let mut folded = HashMap::new();
        let mut split_terms = Vec::new();

        for (term, entry) in &entries {
            if term.is_empty() {
                return Err(TranslationError::ConfigError("词典术语不能为空".to_string()));
            }
            if !entry.case {
                if let Some(previous) = folded.insert(term.to_lowercase(), (term, entry.clone())) {
                    return Err(TranslationError::ConfigError(format!(
                        "不区分大小写的词典术语重复: `{}` 与 `{}`",
                        previous.0, term
                    )));
                }
            }
            if !entry.standalone {
                let pattern = term_pattern(term, entry.case);
                split_terms.push(SplitTerm {
                    term: term.clone(),
                    entry: entry.clone(),
                    anchored: Regex::new(&format!("^(?:{})", pattern))?,
                });
            }
        }

        split_terms.sort_by(|a, b| {
            b.term
                .chars()
                .count()
                .cmp(&a.term.chars().count())
                .then_with(|| a.term.cmp(&b.term))
        });

        let any_term = if split_terms.is_empty() {
            None
        } else {
            let alternation = split_terms
                .iter()
                .map(|t| term_pattern(&t.term, t.entry.case))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        let folded: HashMap<String, DictEntry> = folded
            .into_iter()
            .map(|(key, (_, entry))| (key, entry))
            .collect();

        Ok(Self {
            entries: entries.into_iter().collect(),
            folded,
            split_terms,
            any_term,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 词典查找：精确匹配，否则回退到不区分大小写的词条
    pub fn lookup(&self, text: &str) -> Option<&DictEntry> {
        self.entries
            .get(text)
            .or_else(|| self.folded.get(&text.to_lowercase()))
    }

    /// 整段文本是否等于某个独立术语
    pub fn is_standalone_term(&self, text: &str) -> bool {
        if self
            .entries
            .get(text)
            .is_some_and(|entry| entry.standalone)
        {
            return true;
        }
        self.folded
            .get(&text.to_lowercase())
            .is_some_and(|entry| entry.standalone)
    }

    pub fn split_terms(&self) -> &[SplitTerm] {
        &self.split_terms
    }

    /// 从 `start` 起第一个候选术语出现的字节位置
    pub fn next_candidate(&self, text: &str, start: usize) -> Option<usize> {
        self.any_term
            .as_ref()
            .and_then(|re| re.find_at(text, start))
            .map(|m| m.start())
    }
}

fn term_pattern(term: &str, case: bool) -> String {
    if case {
        regex::escape(term)
    } else {
        format!("(?i:{})", regex::escape(term))
    }
}
