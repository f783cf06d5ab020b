//! 基于 redb 的持久化缓存存储

use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableTableMetadata, TableDefinition};

use super::cache::CacheStore;
use crate::translation::error::TranslationResult;

const TRANSLATIONS: TableDefinition<&str, &str> = TableDefinition::new("translations");

/// 磁盘缓存，进程重启后仍保留
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// 打开（或创建）缓存文件
    pub fn open<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let db = Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            txn.open_table(TRANSLATIONS)?;
        }
        txn.commit()?;

        tracing::debug!("已打开翻译缓存: {}", path.as_ref().display());
        Ok(Self { db })
    }

    /// 条目数
    pub fn len(&self) -> TranslationResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TRANSLATIONS)?;
        Ok(table.len()?)
    }
}

#[async_trait(?Send)]
impl CacheStore for RedbStore {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TRANSLATIONS)?;
        let value = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> TranslationResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TRANSLATIONS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }
}
