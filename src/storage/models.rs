//! 数据模型定义
//!
//! 词条 (Entry) 是唯一的领域实体：一个单词及其译文列表。

use chrono::{DateTime, Utc};
use rusqlite::{Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

use crate::storage::{StorageError, StorageResult};

// ============================================================
// Entry - 词条
// ============================================================

/// 词条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// 单词（唯一键）
    pub word: String,
    /// 译文列表，合并后不含重复项
    pub translations: Vec<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最后一次改写译文的时间
    pub updated_at: DateTime<Utc>,
}

/// 数据库中的原始词条行，译文尚未解码
#[derive(Debug, Clone)]
pub(crate) struct EntryRow {
    pub word: String,
    pub translations: String,
    pub created_at: String,
    pub updated_at: String,
}

impl EntryRow {
    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            word: row.get("word")?,
            translations: row.get("translations")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// 解码为 [`Entry`]，译文列非法时返回 `Decode` 错误
    pub fn decode(self) -> StorageResult<Entry> {
        let translations = decode_translations(&self.word, &self.translations)?;
        Ok(Entry {
            word: self.word,
            translations,
            created_at: parse_datetime(self.created_at),
            updated_at: parse_datetime(self.updated_at),
        })
    }
}

// ============================================================
// 译文列编解码
// ============================================================

/// 解码译文列
///
/// 只接受 JSON 字符串数组；对象、数字数组、非 JSON 文本均视为解码失败。
pub fn decode_translations(word: &str, raw: &str) -> StorageResult<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw).map_err(|source| StorageError::Decode {
        word: word.to_string(),
        source,
    })
}

/// 编码译文列为紧凑的 JSON 数组文本，空列表为 `[]`
pub fn encode_translations(translations: &[String]) -> StorageResult<String> {
    serde_json::to_string(translations).map_err(|e| StorageError::Serialization(e.to_string()))
}

// ============================================================
// 辅助函数
// ============================================================

/// 解析日期时间字符串
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S") {
        return DateTime::from_naive_utc_and_offset(dt, Utc);
    }

    // 无法解析时退回 Unix 纪元
    DateTime::<Utc>::default()
}

/// 格式化日期时间为字符串
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
