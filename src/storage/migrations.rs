//! 数据库迁移模块
//!
//! 管理词条表的版本迁移，确保数据库结构与应用版本保持一致。
//!
//! ## 迁移策略
//! - 每个迁移在独立事务中执行
//! - 迁移记录存储在 schema_migrations 表中，按表名 (scope) 区分，
//!   同一个数据库文件可以容纳多张词条表

use rusqlite::{params, Connection};

use crate::storage::queries::EntryQueries;
use crate::storage::{StorageError, StorageResult};

/// 当前数据库 schema 版本
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// 初始化 schema SQL (V1)
const INIT_SCHEMA: &str = include_str!("schema.sql");

/// 迁移记录
#[derive(Debug, Clone)]
pub struct Migration {
    /// 迁移版本号
    pub version: i32,
    /// 迁移名称/描述
    pub name: String,
    /// 迁移 SQL 语句
    pub sql: String,
}

impl Migration {
    /// 创建新的迁移
    pub fn new(version: i32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// 获取指定词条表的所有迁移定义
///
/// 返回按版本号排序的迁移列表
pub fn get_migrations(queries: &EntryQueries) -> Vec<Migration> {
    vec![
        // V1: 初始表结构
        Migration::new(1, "初始表结构", queries.render(INIT_SCHEMA)),
        // V2: 不区分大小写的前缀查询索引
        Migration::new(
            2,
            "添加单词检索索引",
            queries.render(
                "CREATE INDEX IF NOT EXISTS idx_{table}_word_nocase ON {table}(word COLLATE NOCASE);",
            ),
        ),
    ]
}

/// 确保迁移表存在
fn ensure_migrations_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            scope TEXT NOT NULL,
            version INTEGER NOT NULL,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL,
            PRIMARY KEY (scope, version)
        );
        "#,
    )
    .map_err(|e| StorageError::Migration(format!("failed to create migrations table: {}", e)))?;

    Ok(())
}

/// 获取当前数据库版本
///
/// 没有迁移记录时返回 0
pub fn get_current_version(conn: &Connection, scope: &str) -> i32 {
    if ensure_migrations_table(conn).is_err() {
        return 0;
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations WHERE scope = ?1",
        [scope],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// 获取已应用的迁移版本列表
fn get_applied_versions(conn: &Connection, scope: &str) -> StorageResult<Vec<i32>> {
    ensure_migrations_table(conn)?;

    let mut stmt =
        conn.prepare("SELECT version FROM schema_migrations WHERE scope = ?1 ORDER BY version")?;
    let versions = stmt
        .query_map([scope], |row| row.get(0))?
        .collect::<Result<Vec<i32>, _>>()?;

    Ok(versions)
}

/// 记录迁移已应用
fn record_migration(conn: &Connection, scope: &str, migration: &Migration) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (scope, version, name, applied_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            scope,
            migration.version,
            migration.name,
            chrono::Utc::now().timestamp()
        ],
    )?;

    Ok(())
}

/// 运行数据库迁移
///
/// 检查当前数据库版本并执行必要的迁移脚本。
/// 每个迁移在独立事务中执行，失败时自动回滚该迁移。
///
/// # Returns
/// * `Result<i32, StorageError>` - 成功返回最终版本号
pub fn run_migrations(conn: &Connection, queries: &EntryQueries) -> Result<i32, StorageError> {
    let scope = queries.table().as_str();
    ensure_migrations_table(conn)?;

    let applied_versions = get_applied_versions(conn, scope)?;
    let mut final_version = get_current_version(conn, scope);

    tracing::debug!(
        table = scope,
        current = final_version,
        target = CURRENT_SCHEMA_VERSION,
        "checking schema version"
    );

    for migration in get_migrations(queries) {
        if applied_versions.contains(&migration.version) {
            continue;
        }

        tracing::info!(table = scope, version = migration.version, name = %migration.name, "running migration");

        match execute_migration_in_transaction(conn, scope, &migration) {
            Ok(()) => {
                final_version = migration.version;
            }
            Err(e) => {
                tracing::error!(table = scope, version = migration.version, error = %e, "migration failed");
                return Err(e);
            }
        }
    }

    Ok(final_version)
}

/// 在事务中执行单个迁移
fn execute_migration_in_transaction(
    conn: &Connection,
    scope: &str,
    migration: &Migration,
) -> StorageResult<()> {
    conn.execute("BEGIN IMMEDIATE", [])?;

    match conn.execute_batch(&migration.sql) {
        Ok(()) => {
            if let Err(e) = record_migration(conn, scope, migration) {
                conn.execute("ROLLBACK", []).ok();
                return Err(e);
            }

            conn.execute("COMMIT", [])?;
            Ok(())
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(StorageError::Migration(format!(
                "migration v{} ({}) failed: {}",
                migration.version, scope, e
            )))
        }
    }
}

/// 迁移记录
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i32,
    pub name: String,
    pub applied_at: i64,
}

/// 获取迁移历史
pub fn get_migration_history(conn: &Connection, scope: &str) -> StorageResult<Vec<MigrationRecord>> {
    ensure_migrations_table(conn)?;

    let mut stmt = conn.prepare(
        "SELECT version, name, applied_at FROM schema_migrations WHERE scope = ?1 ORDER BY version",
    )?;

    let records = stmt
        .query_map([scope], |row| {
            Ok(MigrationRecord {
                version: row.get(0)?,
                name: row.get(1)?,
                applied_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// 数据库健康状态
#[derive(Debug, Clone)]
pub struct DatabaseHealth {
    pub table: String,
    pub schema_version: i32,
    pub is_healthy: bool,
    pub table_present: bool,
    pub needs_migration: bool,
    pub db_size_bytes: i64,
    pub entry_count: i64,
    pub migration_count: usize,
}

/// 数据库健康检查
pub fn health_check(conn: &Connection, queries: &EntryQueries) -> StorageResult<DatabaseHealth> {
    let scope = queries.table().as_str();
    let version = get_current_version(conn, scope);

    let table_present: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
        [scope],
        |row| row.get(0),
    )?;

    let page_count: i64 = conn
        .query_row("PRAGMA page_count", [], |row| row.get(0))
        .unwrap_or(0);
    let page_size: i64 = conn
        .query_row("PRAGMA page_size", [], |row| row.get(0))
        .unwrap_or(0);

    let entry_count: i64 = if table_present {
        conn.query_row(&queries.count, [], |row| row.get(0))?
    } else {
        0
    };

    let migration_count = get_migration_history(conn, scope)?.len();

    Ok(DatabaseHealth {
        table: scope.to_string(),
        schema_version: version,
        is_healthy: table_present && version == CURRENT_SCHEMA_VERSION,
        table_present,
        needs_migration: version < CURRENT_SCHEMA_VERSION,
        db_size_bytes: page_count * page_size,
        entry_count,
        migration_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::queries::TableName;

    fn setup() -> (Connection, EntryQueries) {
        (
            Connection::open_in_memory().unwrap(),
            EntryQueries::new(TableName::default()),
        )
    }

    #[test]
    fn test_get_migrations() {
        let (_, queries) = setup();
        let migrations = get_migrations(&queries);
        assert_eq!(migrations.len(), CURRENT_SCHEMA_VERSION as usize);
        assert_eq!(migrations[0].version, 1);
        assert!(migrations[0].sql.contains("CREATE TABLE IF NOT EXISTS dictionary"));
        assert!(!migrations[1].sql.contains("{table}"));
    }

    #[test]
    fn test_initial_migration() {
        let (conn, queries) = setup();

        let version = run_migrations(&conn, &queries).expect("Migration should succeed");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);

        let health = health_check(&conn, &queries).unwrap();
        assert!(health.is_healthy);
        assert!(health.table_present);
        assert_eq!(health.entry_count, 0);
        assert_eq!(health.migration_count, 2);
    }

    #[test]
    fn test_idempotent_migration() {
        let (conn, queries) = setup();

        run_migrations(&conn, &queries).expect("First migration should succeed");
        run_migrations(&conn, &queries).expect("Second migration should succeed");

        assert_eq!(get_current_version(&conn, "dictionary"), CURRENT_SCHEMA_VERSION);
        assert_eq!(get_migration_history(&conn, "dictionary").unwrap().len(), 2);
    }

    #[test]
    fn test_scopes_are_independent() {
        let (conn, queries) = setup();
        run_migrations(&conn, &queries).unwrap();

        let other = EntryQueries::new(TableName::new("glossary").unwrap());
        assert_eq!(get_current_version(&conn, "glossary"), 0);

        run_migrations(&conn, &other).unwrap();
        assert_eq!(get_current_version(&conn, "glossary"), CURRENT_SCHEMA_VERSION);
        assert!(health_check(&conn, &other).unwrap().table_present);
    }

    #[test]
    fn test_migration_history() {
        let (conn, queries) = setup();
        run_migrations(&conn, &queries).unwrap();

        let history = get_migration_history(&conn, "dictionary").unwrap();
        assert_eq!(history[0].version, 1);
        assert_eq!(history[0].name, "初始表结构");
        assert!(history[0].applied_at > 0);
    }

    #[test]
    fn test_health_check_before_migration() {
        let (conn, queries) = setup();

        let health = health_check(&conn, &queries).unwrap();
        assert!(!health.is_healthy);
        assert!(!health.table_present);
        assert!(health.needs_migration);
        assert_eq!(health.entry_count, 0);
    }
}
