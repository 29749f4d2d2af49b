//! 词典命令
//!
//! 暴露存储功能给命令行界面，包括：
//! - 存储初始化（失败时进入禁用模式）
//! - 单词检索与译文查看
//! - 批量导入
//! - 状态与日志查看

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::Level;

use crate::config::AppConfig;
use crate::diagnostics::Diagnostics;
use crate::import::{
    CancelFlag, ImportError, ImportProgress, ImportReport, ImportResult, ImportService,
};
use crate::query::{format_translations, QueryService};
use crate::storage::{Storage, StorageError, StorageResult, TableName};

/// 禁用模式下所有存储相关命令的统一回答
pub const STORE_UNAVAILABLE: &str = "store unavailable";

// ============================================================
// 应用状态管理
// ============================================================

struct Services {
    storage: Arc<Storage>,
    query: QueryService,
    import: ImportService,
}

/// 应用状态
///
/// 存储无法初始化时 `services` 为空，命令回答 [`STORE_UNAVAILABLE`]，
/// 诊断日志仍然可以查看。
pub struct AppState {
    diagnostics: Diagnostics,
    services: Option<Services>,
}

impl AppState {
    /// 按配置打开存储，失败时进入禁用模式
    pub fn init(config: &AppConfig, diagnostics: Diagnostics) -> Self {
        match open_storage(config) {
            Ok(storage) => {
                diagnostics.info(format!(
                    "opened {} (table `{}`)",
                    storage.db_path(),
                    storage.table()
                ));
                Self::with_storage(storage, diagnostics)
            }
            Err(e) => {
                diagnostics.error(format!(
                    "could not open {}: {}",
                    config.database.display(),
                    map_storage_error(e)
                ));
                Self::disabled(diagnostics)
            }
        }
    }

    pub fn with_storage(storage: Storage, diagnostics: Diagnostics) -> Self {
        let storage = Arc::new(storage);
        let services = Services {
            query: QueryService::new(Arc::clone(&storage), diagnostics.clone()),
            import: ImportService::new(Arc::clone(&storage), diagnostics.clone()),
            storage,
        };

        Self {
            diagnostics,
            services: Some(services),
        }
    }

    pub fn disabled(diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            services: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.services.is_some()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn services(&self) -> Result<&Services, String> {
        self.services
            .as_ref()
            .ok_or_else(|| STORE_UNAVAILABLE.to_string())
    }
}

fn open_storage(config: &AppConfig) -> StorageResult<Storage> {
    let table = TableName::new(config.table.as_str())?;
    Storage::open(&config.database, table)
}

// ============================================================
// 响应类型定义
// ============================================================

/// 存储状态
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    /// 数据库路径
    pub database: String,
    /// 词条表名
    pub table: String,
    pub schema_version: i32,
    pub is_healthy: bool,
    /// 词条总数
    pub entry_count: i64,
    pub db_size_bytes: i64,
    /// 是否有导入正在运行
    pub import_running: bool,
}

// ============================================================
// 辅助函数
// ============================================================

/// 将 StorageError 转换为用户友好的错误消息
pub fn map_storage_error(e: StorageError) -> String {
    match e {
        StorageError::Database(e) => format!("database error: {}", e),
        StorageError::Migration(e) => format!("schema migration failed: {}", e),
        StorageError::Decode { word, .. } => {
            format!("stored translations of `{}` are corrupted", word)
        }
        StorageError::Serialization(e) => format!("could not encode translations: {}", e),
        StorageError::NotFound(word) => format!("`{}` is not in the dictionary", word),
        StorageError::LockError(e) => format!("store is busy: {}", e),
        StorageError::InvalidTableName(name) => format!("invalid table name `{}`", name),
    }
}

/// 将 ImportError 转换为用户友好的错误消息
pub fn map_import_error(e: ImportError) -> String {
    match e {
        ImportError::Io(e) => format!("could not read the import file: {}", e),
        ImportError::Store { line, source } => format!(
            "import stopped at line {}: {}",
            line,
            map_storage_error(source)
        ),
        ImportError::AlreadyRunning => "an import is already running".to_string(),
        ImportError::Join(e) => format!("import task failed: {}", e),
    }
}

// ============================================================
// 查询命令
// ============================================================

/// 检索单词（空文本返回全部单词）
pub fn search_words(state: &AppState, text: &str) -> Result<Vec<String>, String> {
    state
        .services()?
        .query
        .search(text)
        .map_err(map_storage_error)
}

/// 获取单词的译文，每行一个
pub fn show_translations(state: &AppState, word: &str) -> Result<String, String> {
    let translations = state
        .services()?
        .query
        .select_word(word)
        .map_err(map_storage_error)?;

    Ok(format_translations(&translations))
}

// ============================================================
// 导入命令
// ============================================================

/// 同步导入文件
pub fn import_file<F>(
    state: &AppState,
    path: &Path,
    on_progress: F,
    cancel: &CancelFlag,
) -> Result<ImportReport, String>
where
    F: FnMut(ImportProgress),
{
    state
        .services()?
        .import
        .run_file(path, on_progress, cancel)
        .map_err(map_import_error)
}

/// 在后台导入文件
///
/// 文件在调用时读取；返回的任务句柄交给 [`finish_import`] 等待结果。
pub fn start_import<F>(
    state: &AppState,
    path: &Path,
    on_progress: F,
    cancel: CancelFlag,
) -> Result<JoinHandle<ImportResult<ImportReport>>, String>
where
    F: FnMut(ImportProgress) + Send + 'static,
{
    let import = &state.services()?.import;
    let source = import.read_source(path).map_err(map_import_error)?;

    import
        .spawn(source, on_progress, cancel)
        .map_err(map_import_error)
}

/// 等待后台导入结束
pub async fn finish_import(
    handle: JoinHandle<ImportResult<ImportReport>>,
) -> Result<ImportReport, String> {
    handle
        .await
        .map_err(ImportError::from)
        .and_then(|result| result)
        .map_err(map_import_error)
}

// ============================================================
// 状态与日志
// ============================================================

/// 获取存储状态
pub fn store_status(state: &AppState) -> Result<StoreStatus, String> {
    let services = state.services()?;
    let health = services.storage.health().map_err(map_storage_error)?;

    Ok(StoreStatus {
        database: services.storage.db_path().to_string(),
        table: health.table,
        schema_version: health.schema_version,
        is_healthy: health.is_healthy,
        entry_count: health.entry_count,
        db_size_bytes: health.db_size_bytes,
        import_running: services.import.is_running(),
    })
}

/// 最近的诊断日志
pub fn recent_logs(state: &AppState, min_level: Level) -> String {
    state.diagnostics.render(min_level)
}
