//! 词条数据库操作
//!
//! 提供词条的创建、译文读写与子串检索。

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::models::{
    decode_translations, encode_translations, format_datetime, Entry, EntryRow,
};
use crate::storage::queries::{substring_pattern, EntryQueries};
use crate::storage::{StorageError, StorageResult};

/// 词条数据库操作仓库
///
/// 支持两种使用方式：
/// 1. 使用 `Arc<Mutex<Connection>>` 进行线程安全操作
/// 2. 使用 [`EntryRepositoryRef`] 借用连接（适用于事务内操作）
pub struct EntryRepository {
    conn: Arc<Mutex<Connection>>,
    queries: Arc<EntryQueries>,
}

impl EntryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>, queries: Arc<EntryQueries>) -> Self {
        Self { conn, queries }
    }

    /// 获取连接锁
    fn get_conn(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 词条不存在时插入空译文列表，已存在时不做任何事
    ///
    /// 返回是否新建了词条
    pub fn ensure_exists(&self, word: &str) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        Self::ensure_exists_internal(&conn, &self.queries, word)
    }

    /// 读取并解码词条的译文列表
    pub fn get_translations(&self, word: &str) -> StorageResult<Vec<String>> {
        let conn = self.get_conn()?;
        Self::get_translations_internal(&conn, &self.queries, word)
    }

    /// 整体覆盖词条的译文列表
    pub fn set_translations(&self, word: &str, translations: &[String]) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::set_translations_internal(&conn, &self.queries, word, translations)
    }

    /// 子串检索单词
    pub fn search(&self, text: &str) -> StorageResult<Vec<String>> {
        let conn = self.get_conn()?;
        Self::search_internal(&conn, &self.queries, text)
    }

    /// 获取完整词条
    pub fn get_entry(&self, word: &str) -> StorageResult<Option<Entry>> {
        let conn = self.get_conn()?;
        Self::get_entry_internal(&conn, &self.queries, word)
    }

    /// 词条总数
    pub fn count(&self) -> StorageResult<i64> {
        let conn = self.get_conn()?;
        Self::count_internal(&conn, &self.queries)
    }

    // ============================================================
    // 内部实现方法（静态方法，接受 &Connection）
    // ============================================================

    pub fn ensure_exists_internal(
        conn: &Connection,
        queries: &EntryQueries,
        word: &str,
    ) -> StorageResult<bool> {
        let now = format_datetime(Utc::now());
        let inserted = conn.execute(&queries.insert_if_absent, params![word, now])?;
        Ok(inserted > 0)
    }

    pub fn get_translations_internal(
        conn: &Connection,
        queries: &EntryQueries,
        word: &str,
    ) -> StorageResult<Vec<String>> {
        let raw: Option<String> = conn
            .query_row(&queries.select_translations, params![word], |row| row.get(0))
            .optional()?;

        match raw {
            Some(raw) => decode_translations(word, &raw),
            None => Err(StorageError::NotFound(word.to_string())),
        }
    }

    /// 单条 UPDATE 语句完成改写，失败时原值保持不变
    pub fn set_translations_internal(
        conn: &Connection,
        queries: &EntryQueries,
        word: &str,
        translations: &[String],
    ) -> StorageResult<()> {
        let encoded = encode_translations(translations)?;
        let now = format_datetime(Utc::now());

        let updated = conn.execute(&queries.update_translations, params![word, encoded, now])?;
        if updated == 0 {
            return Err(StorageError::NotFound(word.to_string()));
        }

        Ok(())
    }

    /// 空字符串匹配全部词条；结果按单词升序，表内容不变时顺序稳定
    pub fn search_internal(
        conn: &Connection,
        queries: &EntryQueries,
        text: &str,
    ) -> StorageResult<Vec<String>> {
        let mut stmt = conn.prepare_cached(&queries.search)?;

        let words = stmt
            .query_map(params![substring_pattern(text)], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(words)
    }

    pub fn get_entry_internal(
        conn: &Connection,
        queries: &EntryQueries,
        word: &str,
    ) -> StorageResult<Option<Entry>> {
        let row = conn
            .query_row(&queries.select_entry, params![word], |row| {
                EntryRow::from_row(row)
            })
            .optional()?;

        row.map(EntryRow::decode).transpose()
    }

    pub fn count_internal(conn: &Connection, queries: &EntryQueries) -> StorageResult<i64> {
        let count: i64 = conn.query_row(&queries.count, [], |row| row.get(0))?;
        Ok(count)
    }
}

// ============================================================
// 借用版本的 Repository（用于事务内操作）
// ============================================================

/// 借用连接的词条操作仓库
///
/// 用于在事务中直接操作数据库，避免重复加锁导致死锁。
pub struct EntryRepositoryRef<'a> {
    conn: &'a Connection,
    queries: &'a EntryQueries,
}

impl<'a> EntryRepositoryRef<'a> {
    pub fn new(conn: &'a Connection, queries: &'a EntryQueries) -> Self {
        Self { conn, queries }
    }

    pub fn ensure_exists(&self, word: &str) -> StorageResult<bool> {
        EntryRepository::ensure_exists_internal(self.conn, self.queries, word)
    }

    pub fn get_translations(&self, word: &str) -> StorageResult<Vec<String>> {
        EntryRepository::get_translations_internal(self.conn, self.queries, word)
    }

    pub fn set_translations(&self, word: &str, translations: &[String]) -> StorageResult<()> {
        EntryRepository::set_translations_internal(self.conn, self.queries, word, translations)
    }

    pub fn search(&self, text: &str) -> StorageResult<Vec<String>> {
        EntryRepository::search_internal(self.conn, self.queries, text)
    }

    pub fn get_entry(&self, word: &str) -> StorageResult<Option<Entry>> {
        EntryRepository::get_entry_internal(self.conn, self.queries, word)
    }

    pub fn count(&self) -> StorageResult<i64> {
        EntryRepository::count_internal(self.conn, self.queries)
    }
}
