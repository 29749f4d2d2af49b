//! 词条表 SQL 构建
//!
//! 表名来自配置文件，无法作为绑定参数传入，因此所有 SQL 文本都只在这里
//! 拼接一次：表名先经过 [`TableName`] 校验，其余取值一律使用绑定参数。
//! 导入器与查询服务不会自己构造 SQL。

use std::fmt;
use std::str::FromStr;

use crate::storage::{StorageError, StorageResult};

/// 默认词条表名
pub const DEFAULT_TABLE: &str = "dictionary";

/// schema 模板中的表名占位符
const TABLE_PLACEHOLDER: &str = "{table}";

/// LIKE 模式的转义字符
const LIKE_ESCAPE: char = '\\';

// ============================================================
// TableName - 经过校验的表名
// ============================================================

/// 经过校验的 SQL 标识符
///
/// 规则：`[A-Za-z_][A-Za-z0-9_]*`，长度不超过 [`TableName::MAX_LEN`]，
/// 且不能以 `sqlite_` 开头（SQLite 保留前缀）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub const MAX_LEN: usize = 64;

    pub fn new(name: impl Into<String>) -> StorageResult<Self> {
        let name = name.into();

        let mut chars = name.chars();
        let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        let reserved = name.to_ascii_lowercase().starts_with("sqlite_");

        if !valid_head || !valid_tail || reserved || name.len() > Self::MAX_LEN {
            return Err(StorageError::InvalidTableName(name));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl FromStr for TableName {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================
// EntryQueries - 预构建的语句集合
// ============================================================

/// 某个词条表的全部 SQL 语句
///
/// 每个 [`crate::storage::Storage`] 持有一份，按表名构建一次。
#[derive(Debug, Clone)]
pub struct EntryQueries {
    table: TableName,
    /// ?1 = word, ?2 = 当前时间
    pub(crate) insert_if_absent: String,
    /// ?1 = word
    pub(crate) select_translations: String,
    /// ?1 = word, ?2 = JSON 文本, ?3 = 当前时间
    pub(crate) update_translations: String,
    /// ?1 = word
    pub(crate) select_entry: String,
    /// ?1 = LIKE 模式
    pub(crate) search: String,
    pub(crate) count: String,
}

impl EntryQueries {
    pub fn new(table: TableName) -> Self {
        let t = table.as_str();

        Self {
            insert_if_absent: format!(
                "INSERT OR IGNORE INTO {t} (word, translations, created_at, updated_at) \
                 VALUES (?1, '[]', ?2, ?2)"
            ),
            select_translations: format!("SELECT translations FROM {t} WHERE word = ?1"),
            update_translations: format!(
                "UPDATE {t} SET translations = ?2, updated_at = ?3 WHERE word = ?1"
            ),
            select_entry: format!(
                "SELECT word, translations, created_at, updated_at FROM {t} WHERE word = ?1"
            ),
            search: format!(
                "SELECT word FROM {t} WHERE word LIKE ?1 ESCAPE '{LIKE_ESCAPE}' ORDER BY word ASC"
            ),
            count: format!("SELECT COUNT(*) FROM {t}"),
            table,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// 将 schema 模板中的 `{table}` 替换为实际表名
    pub fn render(&self, template: &str) -> String {
        template.replace(TABLE_PLACEHOLDER, self.table.as_str())
    }
}

/// 把用户输入转换为子串匹配的 LIKE 模式
///
/// `%`、`_` 与转义字符本身按字面量处理；空输入得到 `%%`，匹配全部词条。
pub fn substring_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
