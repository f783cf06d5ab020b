//! 生命周期钩子
//!
//! 整页翻译前后调用 `before` / `after`（即使翻译过程出错，`after` 也会被调用），
//! 每个元素写回前后调用 `before_element` / `after_element`。

use async_trait::async_trait;
use markup5ever_rcdom::Handle;

/// 翻译生命周期钩子，所有方法默认为空操作
#[async_trait(?Send)]
pub trait TranslationHooks {
    /// 整页翻译开始前
    async fn before(&self) {}

    /// 整页翻译结束后
    async fn after(&self) {}

    /// 返回 `false` 时跳过该元素；引擎等待其完成后才继续
    async fn before_element(&self, _element: &Handle) -> bool {
        true
    }

    /// 元素处理完成后，附带原文与译文
    fn after_element(&self, _element: &Handle, _original: &str, _translated: &str) {}
}

/// 不做任何事情的钩子
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl TranslationHooks for NoopHooks {}
