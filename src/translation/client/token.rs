//! 授权令牌缓存

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// 带签发时间的临时凭证
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn issued_at(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    /// 在 `now` 时刻是否仍处于有效期内
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.token.is_empty() {
            return false;
        }
        let Ok(ttl) = TimeDelta::from_std(ttl) else {
            return true;
        };
        let age = now.signed_duration_since(self.issued_at);
        age >= TimeDelta::zero() && age < ttl
    }
}

/// 凭证缓存，生命周期长于单次请求
pub trait TokenStore {
    fn get(&self) -> Option<AuthToken>;

    fn set(&self, token: AuthToken);

    fn clear(&self);
}

/// 进程内凭证缓存
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AuthToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AuthToken> {
        self.token.lock().ok().and_then(|token| token.clone())
    }

    fn set(&self, token: AuthToken) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token);
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}
