//! 选择器匹配
//!
//! 使用 cssparser 分词，将 force/ignore/root 配置中的选择器预编译为一个组合匹配器，
//! 扫描时每个节点只需一次匹配调用。
//!
//! 支持的语法：类型、`*`、`.class`、`#id`、属性选择器（`[a]`、`[a=v]`、`[a~=v]`、
//! `[a|=v]`、`[a^=v]`、`[a$=v]`、`[a*=v]`，可带 `i` 标志）、复合选择器，
//! 以及后代（空白）和子代（`>`）组合符。

use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};
use markup5ever_rcdom::{Handle, NodeData};

use super::dom::get_parent_node;
use crate::translation::error::{TranslationError, TranslationResult};

type SelectorParseError<'i> = ParseError<'i, String>;

/// 预编译的选择器列表（逗号分隔的各项任一匹配即可）
#[derive(Debug, Clone)]
pub struct SelectorList {
    source: Vec<String>,
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// 由组合符连接的复合选择器序列，`combinators[i]` 位于 `parts[i]` 与 `parts[i + 1]` 之间
#[derive(Debug, Clone)]
struct ComplexSelector {
    parts: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Default)]
struct CompoundSelector {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashPrefix,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone)]
struct AttrSelector {
    name: String,
    op: Option<(AttrOp, String)>,
    case_insensitive: bool,
}

impl SelectorList {
    /// 解析单个选择器字符串（可包含逗号分隔的多项）
    pub fn parse(selector: &str) -> TranslationResult<Self> {
        let selectors = parse_complex_list(selector)?;
        Ok(Self {
            source: vec![selector.to_string()],
            selectors,
        })
    }

    /// 将多个选择器合并为一个组合匹配器；列表为空时返回 `None`
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S]) -> TranslationResult<Option<Self>> {
        if selectors.is_empty() {
            return Ok(None);
        }

        let mut source = Vec::with_capacity(selectors.len());
        let mut compiled = Vec::new();
        for selector in selectors {
            let selector = selector.as_ref();
            compiled.extend(parse_complex_list(selector)?);
            source.push(selector.to_string());
        }

        Ok(Some(Self {
            source,
            selectors: compiled,
        }))
    }

    /// 原始选择器文本
    pub fn source(&self) -> &[String] {
        &self.source
    }

    /// 节点本身是否匹配
    pub fn matches(&self, node: &Handle) -> bool {
        if !matches!(node.data, NodeData::Element { .. }) {
            return false;
        }
        self.selectors.iter().any(|selector| selector.matches(node))
    }

    /// 任一祖先（不含自身）是否匹配
    pub fn matches_ancestor(&self, node: &Handle) -> bool {
        let mut current = get_parent_node(node);
        while let Some(parent) = current {
            if self.matches(&parent) {
                return true;
            }
            current = get_parent_node(&parent);
        }
        false
    }

    /// 按文档顺序返回第一个匹配的后代（不含根节点）
    pub fn query_first(&self, root: &Handle) -> Option<Handle> {
        let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();

        while let Some(node) = stack.pop() {
            if self.matches(&node) {
                return Some(node);
            }
            for child in node.children.borrow().iter().rev() {
                stack.push(child.clone());
            }
        }

        None
    }

    /// 是否存在匹配的后代（不含根节点）
    pub fn query_any(&self, root: &Handle) -> bool {
        self.query_first(root).is_some()
    }
}

impl ComplexSelector {
    fn matches(&self, node: &Handle) -> bool {
        match self.parts.len() {
            0 => false,
            len => self.match_from(node, len - 1),
        }
    }

    fn match_from(&self, node: &Handle, index: usize) -> bool {
        if !self.parts[index].matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => {
                get_parent_node(node).is_some_and(|parent| self.match_from(&parent, index - 1))
            }
            Combinator::Descendant => {
                let mut current = get_parent_node(node);
                while let Some(ancestor) = current {
                    if self.match_from(&ancestor, index - 1) {
                        return true;
                    }
                    current = get_parent_node(&ancestor);
                }
                false
            }
        }
    }
}

impl CompoundSelector {
    fn matches(&self, node: &Handle) -> bool {
        let NodeData::Element { name, attrs, .. } = &node.data else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !name.local.as_ref().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        let attrs = attrs.borrow();
        let attr_value = |attr_name: &str| {
            attrs
                .iter()
                .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(attr_name))
                .map(|attr| attr.value.to_string())
        };

        if !self.ids.is_empty() {
            let Some(id) = attr_value("id") else {
                return false;
            };
            if !self.ids.iter().all(|wanted| *wanted == id) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let Some(class) = attr_value("class") else {
                return false;
            };
            let present: Vec<&str> = class.split_whitespace().collect();
            if !self.classes.iter().all(|wanted| present.contains(&wanted.as_str())) {
                return false;
            }
        }

        self.attrs
            .iter()
            .all(|selector| selector.matches(attr_value(&selector.name).as_deref()))
    }
}

impl AttrSelector {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let Some((op, expected)) = &self.op else {
            return true;
        };

        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), expected.to_lowercase())
        } else {
            (actual.to_string(), expected.clone())
        };

        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => {
                !expected.is_empty() && actual.split_whitespace().any(|word| word == expected)
            }
            AttrOp::DashPrefix => {
                actual == expected || actual.starts_with(&format!("{}-", expected))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

fn parse_complex_list(selector: &str) -> TranslationResult<Vec<ComplexSelector>> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);

    parser
        .parse_comma_separated(|p| parse_complex(p))
        .map_err(|e| TranslationError::SelectorError {
            selector: selector.to_string(),
            reason: describe_error(&e),
        })
}

fn describe_error(error: &SelectorParseError<'_>) -> String {
    let reason = match &error.kind {
        ParseErrorKind::Custom(message) => message.clone(),
        ParseErrorKind::Basic(kind) => format!("{:?}", kind),
    };
    format!(
        "{} (第{}行第{}列)",
        reason, error.location.line, error.location.column
    )
}

fn parse_complex<'i, 't>(
    p: &mut Parser<'i, 't>,
) -> Result<ComplexSelector, SelectorParseError<'i>> {
    let mut parts: Vec<CompoundSelector> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut current = CompoundSelector::default();
    let mut in_compound = false;
    let mut pending: Option<Combinator> = None;

    loop {
        let token = match p.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => {
                if in_compound {
                    parts.push(std::mem::take(&mut current));
                    in_compound = false;
                    pending = Some(Combinator::Descendant);
                }
            }
            Token::Delim('>') => {
                if in_compound {
                    parts.push(std::mem::take(&mut current));
                    in_compound = false;
                } else if parts.is_empty() || pending == Some(Combinator::Child) {
                    return Err(p.new_custom_error("组合符位置无效".to_string()));
                }
                pending = Some(Combinator::Child);
            }
            token => {
                if !in_compound {
                    if let Some(combinator) = pending.take() {
                        combinators.push(combinator);
                    }
                }
                parse_simple(p, token, &mut current, in_compound)?;
                in_compound = true;
            }
        }
    }

    if in_compound {
        parts.push(current);
    } else if pending == Some(Combinator::Child) {
        return Err(p.new_custom_error("选择器以组合符结尾".to_string()));
    }

    if parts.is_empty() {
        return Err(p.new_custom_error("空选择器".to_string()));
    }

    Ok(ComplexSelector { parts, combinators })
}

fn parse_simple<'i, 't>(
    p: &mut Parser<'i, 't>,
    token: Token<'i>,
    compound: &mut CompoundSelector,
    in_compound: bool,
) -> Result<(), SelectorParseError<'i>> {
    match token {
        Token::Ident(name) if !in_compound => {
            compound.tag = Some(name.to_ascii_lowercase());
        }
        Token::Delim('*') if !in_compound => {
            compound.tag = None;
        }
        Token::IDHash(id) => {
            compound.ids.push(id.to_string());
        }
        Token::Delim('.') => {
            let class = match p.next_including_whitespace()?.clone() {
                Token::Ident(class) => class.to_string(),
                other => {
                    let message = format!("类名无效: {:?}", other);
                    return Err(p.new_custom_error(message));
                }
            };
            compound.classes.push(class);
        }
        Token::SquareBracketBlock => {
            let attr = p.parse_nested_block(|p| parse_attribute(p))?;
            compound.attrs.push(attr);
        }
        Token::Colon => {
            return Err(p.new_custom_error("不支持伪类选择器".to_string()));
        }
        other => {
            return Err(p.new_custom_error(format!("意外的记号: {:?}", other)));
        }
    }
    Ok(())
}

fn parse_attribute<'i, 't>(p: &mut Parser<'i, 't>) -> Result<AttrSelector, SelectorParseError<'i>> {
    let name = p.expect_ident()?.to_ascii_lowercase();

    if p.is_exhausted() {
        return Ok(AttrSelector {
            name,
            op: None,
            case_insensitive: false,
        });
    }

    let op = match p.next()?.clone() {
        Token::Delim('=') => AttrOp::Equals,
        Token::IncludeMatch => AttrOp::Includes,
        Token::DashMatch => AttrOp::DashPrefix,
        Token::PrefixMatch => AttrOp::Prefix,
        Token::SuffixMatch => AttrOp::Suffix,
        Token::SubstringMatch => AttrOp::Substring,
        other => {
            return Err(p.new_custom_error(format!("无效的属性运算符: {:?}", other)));
        }
    };
    let value = p.expect_ident_or_string()?.to_string();

    let case_insensitive = if p.is_exhausted() {
        false
    } else {
        let flag = p.expect_ident()?.to_ascii_lowercase();
        match flag.as_str() {
            "i" => true,
            "s" => false,
            _ => return Err(p.new_custom_error(format!("未知的属性标志: {}", flag))),
        }
    };

    Ok(AttrSelector {
        name,
        op: Some((op, value)),
        case_insensitive,
    })
}
