//! 微软翻译 v3 REST 接口客户端
//!
//! 通过 edge 授权端点获取 Bearer 令牌，并在有效期内复用。

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::token::{AuthToken, MemoryTokenStore, TokenStore};
use super::{DetectedLanguage, LanguageInfo, RemoteTranslator};
use crate::translation::config::ServiceConfig;
use crate::translation::error::{TranslationError, TranslationResult};

const API_VERSION: &str = "3.0";

#[derive(Serialize)]
struct TextItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Deserialize)]
struct TranslateItem {
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
struct TranslatedText {
    text: String,
}

#[derive(Deserialize)]
struct DetectItem {
    language: String,
    #[serde(default)]
    score: f64,
    #[serde(rename = "isTranslationSupported", default)]
    is_translation_supported: bool,
}

#[derive(Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    translation: BTreeMap<String, LanguageEntry>,
}

#[derive(Deserialize)]
struct LanguageEntry {
    name: String,
    #[serde(rename = "nativeName")]
    native_name: String,
    #[serde(default)]
    dir: String,
}

/// 微软翻译客户端
pub struct MicrosoftTranslator {
    client: reqwest::Client,
    auth_url: String,
    api_url: String,
    token_ttl: Duration,
    tokens: Rc<dyn TokenStore>,
}

impl MicrosoftTranslator {
    pub fn new(service: &ServiceConfig) -> TranslationResult<Self> {
        Self::with_token_store(service, Rc::new(MemoryTokenStore::new()))
    }

    /// 使用外部提供的凭证缓存（可在多个客户端之间共享）
    pub fn with_token_store(
        service: &ServiceConfig,
        tokens: Rc<dyn TokenStore>,
    ) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(service.request_timeout)
            .build()
            .map_err(|e| TranslationError::NetworkError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            auth_url: service.auth_url.clone(),
            api_url: service.api_url.trim_end_matches('/').to_string(),
            token_ttl: service.token_ttl,
            tokens,
        })
    }

    /// 获取授权令牌；缓存的令牌过期才重新请求
    pub async fn auth_token(&self) -> TranslationResult<String> {
        if let Some(token) = self.tokens.get() {
            if token.is_valid(Utc::now(), self.token_ttl) {
                return Ok(token.token);
            }
            tracing::debug!("授权令牌已过期，重新获取");
        }

        match self.fetch_token().await {
            Ok(token) => {
                self.tokens.set(AuthToken::new(token.clone()));
                Ok(token)
            }
            Err(e) => {
                self.tokens.clear();
                tracing::error!("获取微软翻译授权失败: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_token(&self) -> TranslationResult<String> {
        let response = self
            .client
            .get(&self.auth_url)
            .send()
            .await
            .map_err(|e| TranslationError::AuthError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::AuthError(format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| TranslationError::AuthError(e.to_string()))?;
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(TranslationError::AuthError("授权端点返回空令牌".to_string()));
        }
        Ok(token)
    }

    pub(crate) fn endpoint(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> TranslationResult<Url> {
        let base = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("api-version", API_VERSION));

        Url::parse_with_params(&base, &query)
            .map_err(|e| TranslationError::ConfigError(format!("翻译服务地址无效 {}: {}", base, e)))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> TranslationResult<reqwest::Response> {
        let token = self.auth_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        self.check_status(response).await
    }

    async fn check_status(&self, response: reqwest::Response) -> TranslationResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.clear();
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
        Err(TranslationError::ServiceError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait(?Send)]
impl RemoteTranslator for MicrosoftTranslator {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> TranslationResult<Vec<String>> {
        // 空白文本不发送，原样保留在原位置
        let positions: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(index, _)| index)
            .collect();

        if positions.is_empty() {
            return Ok(texts.to_vec());
        }

        let mut params = Vec::with_capacity(2);
        if let Some(source) = source_lang.filter(|s| !s.is_empty()) {
            params.push(("from", source));
        }
        params.push(("to", target_lang));
        let url = self.endpoint("translate", &params)?;

        let body: Vec<TextItem<'_>> = positions
            .iter()
            .map(|&index| TextItem {
                text: texts[index].as_str(),
            })
            .collect();

        tracing::debug!("请求翻译 {} 条文本 -> {}", body.len(), target_lang);
        let response = self.send_json(url, &body).await?;
        let items: Vec<TranslateItem> = read_json(response).await?;

        merge_translations(texts, &positions, items)
    }

    async fn detect_language(&self, texts: &[String]) -> TranslationResult<Vec<DetectedLanguage>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("detect", &[])?;
        let body: Vec<TextItem<'_>> = texts.iter().map(|text| TextItem { text }).collect();
        let response = self.send_json(url, &body).await?;
        let items: Vec<DetectItem> = read_json(response).await?;

        detected_languages(texts.len(), items)
    }

    async fn supported_languages(&self) -> TranslationResult<Vec<LanguageInfo>> {
        let url = self.endpoint("languages", &[("scope", "translation")])?;
        let response = self.client.get(url).send().await?;
        let languages: LanguagesResponse = read_json(self.check_status(response).await?).await?;

        Ok(language_list(languages))
    }
}

/// 读取完整响应体并按 JSON 解码
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> TranslationResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// 把译文放回非空白文本所在的位置，其余位置保留原文
fn merge_translations(
    texts: &[String],
    positions: &[usize],
    items: Vec<TranslateItem>,
) -> TranslationResult<Vec<String>> {
    if items.len() != positions.len() {
        return Err(TranslationError::SerializationError(format!(
            "翻译结果条数不一致: 请求 {} 条, 返回 {} 条",
            positions.len(),
            items.len()
        )));
    }

    let mut results = texts.to_vec();
    for (&index, item) in positions.iter().zip(items) {
        let translated = item.translations.into_iter().next().ok_or_else(|| {
            TranslationError::SerializationError("翻译结果缺少译文".to_string())
        })?;
        results[index] = translated.text;
    }

    Ok(results)
}

fn detected_languages(
    requested: usize,
    items: Vec<DetectItem>,
) -> TranslationResult<Vec<DetectedLanguage>> {
    if items.len() != requested {
        return Err(TranslationError::SerializationError(format!(
            "语言检测结果条数不一致: 请求 {} 条, 返回 {} 条",
            requested,
            items.len()
        )));
    }

    Ok(items
        .into_iter()
        .map(|item| DetectedLanguage {
            language: item.language,
            score: item.score,
            translation_supported: item.is_translation_supported,
        })
        .collect())
}

fn language_list(languages: LanguagesResponse) -> Vec<LanguageInfo> {
    languages
        .translation
        .into_iter()
        .map(|(code, entry)| LanguageInfo {
            code,
            name: entry.name,
            native_name: entry.native_name,
            dir: entry.dir,
        })
        .collect()
}
