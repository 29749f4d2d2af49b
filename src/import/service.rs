//! 导入服务：互斥保护与后台执行
//!
//! 存储层本身没有事务隔离，因此同一时间只允许一个导入运行。
//! [`ImportService`] 用一个原子标记实现互斥，第二个导入直接返回
//! [`ImportError::AlreadyRunning`]，不会排队等待。

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::diagnostics::Diagnostics;
use crate::import::{
    CancelFlag, ImportError, ImportProgress, ImportReport, ImportResult, ImportSource, Importer,
};
use crate::storage::Storage;

/// 运行中标记，离开作用域时自动释放
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 导入服务
#[derive(Clone)]
pub struct ImportService {
    storage: Arc<Storage>,
    diagnostics: Diagnostics,
    running: Arc<AtomicBool>,
}

impl ImportService {
    pub fn new(storage: Arc<Storage>, diagnostics: Diagnostics) -> Self {
        Self {
            storage,
            diagnostics,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 是否有导入正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn begin(&self) -> ImportResult<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| {
                self.diagnostics
                    .warn("import rejected: another import is still running");
                ImportError::AlreadyRunning
            })?;

        Ok(RunGuard(Arc::clone(&self.running)))
    }

    /// 在当前线程同步执行导入
    pub fn run<F>(
        &self,
        source: &ImportSource,
        on_progress: F,
        cancel: &CancelFlag,
    ) -> ImportResult<ImportReport>
    where
        F: FnMut(ImportProgress),
    {
        let _guard = self.begin()?;
        Importer::new(&self.storage, &self.diagnostics).run(source, on_progress, cancel)
    }

    /// 读取文件并同步导入
    pub fn run_file<P, F>(
        &self,
        path: P,
        on_progress: F,
        cancel: &CancelFlag,
    ) -> ImportResult<ImportReport>
    where
        P: AsRef<Path>,
        F: FnMut(ImportProgress),
    {
        let source = self.read_source(path.as_ref())?;
        self.run(&source, on_progress, cancel)
    }

    /// 在 tokio 阻塞线程池中执行导入
    ///
    /// 互斥标记在调用时立即获取，导入结束（包括失败与取消）后释放。
    /// 必须在 tokio 运行时内调用。
    pub fn spawn<F>(
        &self,
        source: ImportSource,
        on_progress: F,
        cancel: CancelFlag,
    ) -> ImportResult<JoinHandle<ImportResult<ImportReport>>>
    where
        F: FnMut(ImportProgress) + Send + 'static,
    {
        let guard = self.begin()?;
        let storage = Arc::clone(&self.storage);
        let diagnostics = self.diagnostics.clone();

        Ok(tokio::task::spawn_blocking(move || {
            let _guard = guard;
            Importer::new(&storage, &diagnostics).run(&source, on_progress, &cancel)
        }))
    }

    /// 读取导入文件，失败时记录到诊断日志
    pub fn read_source(&self, path: &Path) -> ImportResult<ImportSource> {
        ImportSource::from_path(path).map_err(|e| {
            self.diagnostics
                .warn(format!("could not open {} for reading: {e}", path.display()));
            ImportError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableName;

    fn service() -> ImportService {
        ImportService::new(
            Arc::new(Storage::in_memory(TableName::default()).unwrap()),
            Diagnostics::default(),
        )
    }

    #[test]
    fn test_run_releases_guard() {
        let service = service();
        let source = ImportSource::from_text("cat:feline");

        service.run(&source, |_| {}, &CancelFlag::new()).unwrap();
        assert!(!service.is_running());
        service.run(&source, |_| {}, &CancelFlag::new()).unwrap();
    }

    #[test]
    fn test_nested_run_is_rejected() {
        let service = service();
        let inner = service.clone();
        let mut nested = None;

        service
            .run(
                &ImportSource::from_text("cat:feline"),
                |_| {
                    nested = Some(inner.run(
                        &ImportSource::from_text("dog:bark"),
                        |_| {},
                        &CancelFlag::new(),
                    ));
                },
                &CancelFlag::new(),
            )
            .unwrap();

        assert!(matches!(nested, Some(Err(ImportError::AlreadyRunning))));
        assert!(!service.is_running());
    }

    #[test]
    fn test_guard_released_after_store_error() {
        let service = service();
        {
            let conn = service.storage.connection();
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO dictionary (word, translations) VALUES ('x', 'oops')",
                [],
            )
            .unwrap();
        }

        let result = service.run(&ImportSource::from_text("x:y"), |_| {}, &CancelFlag::new());
        assert!(matches!(result, Err(ImportError::Store { line: 1, .. })));
        assert!(!service.is_running());
    }

    #[test]
    fn test_run_file_missing() {
        let service = service();
        let dir = tempfile::tempdir().unwrap();

        let result = service.run_file(dir.path().join("nope.txt"), |_| {}, &CancelFlag::new());
        assert!(matches!(result, Err(ImportError::Io(_))));
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_spawn_background_import() {
        let service = service();

        let handle = service
            .spawn(
                ImportSource::from_text("cat:feline,kitty\nbad line"),
                |_| {},
                CancelFlag::new(),
            )
            .unwrap();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.malformed_lines, vec![2]);
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_spawn_rejects_while_running() {
        let service = service();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let handle = service
            .spawn(
                ImportSource::from_text("a:1\nb:2"),
                move |p| {
                    if p.processed == 1 {
                        let _ = release_rx.recv();
                    }
                },
                CancelFlag::new(),
            )
            .unwrap();

        let second = service.spawn(ImportSource::from_text("c:3"), |_| {}, CancelFlag::new());
        assert!(matches!(second, Err(ImportError::AlreadyRunning)));

        release_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert!(!service.is_running());
    }
}
