//! SQLite 词条存储模块
//!
//! 提供本地 SQLite 数据库存储功能，支持：
//! - 单词到译文列表的持久化映射（译文以 JSON 数组文本存储）
//! - 词条的幂等创建与整体改写
//! - 单词子串检索

// ============================================================
// 子模块声明
// ============================================================

pub mod entry;
pub mod migrations;
pub mod models;
pub mod queries;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use entry::{EntryRepository, EntryRepositoryRef};
pub use migrations::{run_migrations, DatabaseHealth};
pub use models::Entry;
pub use queries::{EntryQueries, TableName};

// ============================================================
// 依赖导入
// ============================================================

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("translations of `{word}` are not a valid JSON array of strings: {source}")]
    Decode {
        word: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("no entry for `{0}`")]
    NotFound(String),

    #[error("failed to acquire lock: {0}")]
    LockError(String),

    #[error("invalid table name `{0}`")]
    InvalidTableName(String),
}

impl StorageError {
    /// 存储内容损坏（而非连接或写入失败）
    pub fn is_decode(&self) -> bool {
        matches!(self, StorageError::Decode { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// Storage - 数据库连接管理器
// ============================================================

/// 数据库连接管理器
///
/// 持有单一连接与该词条表的预构建语句。没有跨调用的隔离：
/// 调用方需要自行保证导入等写操作不会并发进行。
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    queries: Arc<EntryQueries>,
    db_path: String,
}

impl Storage {
    /// 打开（或创建）数据库文件
    ///
    /// 自动启用 WAL 模式，并运行数据库迁移。
    ///
    /// # Example
    /// ```ignore
    /// let storage = Storage::open("./lexicon.db", TableName::default())?;
    /// ```
    pub fn open<P: AsRef<Path>>(db_path: P, table: TableName) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        Self::from_connection(connection, path_str, table)
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory(table: TableName) -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::from_connection(connection, ":memory:".to_string(), table)
    }

    fn from_connection(
        connection: Connection,
        db_path: String,
        table: TableName,
    ) -> StorageResult<Self> {
        let queries = Arc::new(EntryQueries::new(table));
        let version = run_migrations(&connection, &queries)?;

        tracing::info!(db = %db_path, table = %queries.table(), version, "storage ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            queries,
            db_path,
        })
    }

    /// 获取数据库连接
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 词条表名
    pub fn table(&self) -> &TableName {
        self.queries.table()
    }

    /// 预构建的语句集合
    pub fn queries(&self) -> &EntryQueries {
        &self.queries
    }

    /// 获取词条仓库
    pub fn entries(&self) -> EntryRepository {
        EntryRepository::new(Arc::clone(&self.conn), Arc::clone(&self.queries))
    }

    /// 执行事务
    ///
    /// 闭包返回错误时事务回滚，之前已提交的事务不受影响。
    ///
    /// # Example
    /// ```ignore
    /// storage.transaction(|conn| {
    ///     let repo = EntryRepositoryRef::new(conn, storage.queries());
    ///     repo.ensure_exists("cat")
    /// })?;
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// 数据库健康检查
    pub fn health(&self) -> StorageResult<DatabaseHealth> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        migrations::health_check(&conn, &self.queries)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_in_memory() {
        let storage = Storage::in_memory(TableName::default()).expect("in-memory storage");
        assert_eq!(storage.db_path(), ":memory:");
        assert_eq!(storage.table().as_str(), "dictionary");
    }

    #[test]
    fn test_transaction_commit() {
        let storage = Storage::in_memory(TableName::default()).unwrap();

        let created = storage
            .transaction(|conn| EntryRepositoryRef::new(conn, storage.queries()).ensure_exists("cat"))
            .unwrap();
        assert!(created);
        assert_eq!(storage.entries().count().unwrap(), 1);
    }

    #[test]
    fn test_transaction_rollback_on_error() {
        let storage = Storage::in_memory(TableName::default()).unwrap();

        let result: StorageResult<()> = storage.transaction(|conn| {
            let repo = EntryRepositoryRef::new(conn, storage.queries());
            repo.ensure_exists("cat")?;
            Err(StorageError::NotFound("forced".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(storage.entries().count().unwrap(), 0);
    }

    #[test]
    fn test_health() {
        let storage = Storage::in_memory(TableName::default()).unwrap();
        storage.entries().ensure_exists("cat").unwrap();

        let health = storage.health().unwrap();
        assert!(health.is_healthy);
        assert_eq!(health.entry_count, 1);
        assert_eq!(health.table, "dictionary");
    }

    #[test]
    fn test_is_decode() {
        let err = serde_json::from_str::<Vec<String>>("x").unwrap_err();
        assert!(StorageError::Decode {
            word: "w".to_string(),
            source: err
        }
        .is_decode());
        assert!(!StorageError::NotFound("w".to_string()).is_decode());
    }
}
