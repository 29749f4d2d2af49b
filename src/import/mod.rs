//! 词条批量导入
//!
//! 逐行读取 `WORD:T1,T2` 格式的文本，将译文以保序集合并的方式合入词条表：
//! 解析 → 确保词条存在 → 读取现有译文 → 合并 → 整体写回。
//!
//! - 格式错误的行不会中断导入，只记录行号，导入结束后统一报告
//! - 任一行遇到存储错误立即终止，之前已提交的行保持提交状态
//! - 每行在独立事务中完成，失败的行不会留下半写入的状态
//! - 每处理完一行回调一次进度；行与行之间检查取消标记

pub mod parser;
pub mod service;
pub mod source;

pub use parser::{merge_translations, parse_line, Malformed, ParsedLine, TRANSLATION_SEPARATORS};
pub use service::ImportService;
pub use source::ImportSource;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::diagnostics::Diagnostics;
use crate::storage::{EntryRepositoryRef, Storage, StorageError, StorageResult};

// ============================================================
// 错误类型定义
// ============================================================

/// 导入错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read import source: {0}")]
    Io(#[from] std::io::Error),

    #[error("import aborted at line {line}: {source}")]
    Store {
        line: usize,
        #[source]
        source: StorageError,
    },

    #[error("an import is already running")]
    AlreadyRunning,

    #[error("import task failed: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(e: tokio::task::JoinError) -> Self {
        ImportError::Join(e.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

// ============================================================
// 进度与取消
// ============================================================

/// 导入进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    /// 已处理行数（含格式错误的行）
    pub processed: usize,
    /// 总行数
    pub total: usize,
}

impl ImportProgress {
    /// 进度比例，取值 [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }

    /// 整数百分比，取值 [0, 100]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 / self.total) as u8
    }
}

/// 导入取消标记
///
/// 克隆后共享同一个标记；导入在两行之间检查它。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================
// 导入报告
// ============================================================

/// 一次导入的结果汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// 本次导入的标识，用于关联日志
    pub run_id: Uuid,
    /// 数据源总行数
    pub total_lines: usize,
    /// 实际处理的行数（取消时小于总行数）
    pub processed_lines: usize,
    /// 新建的词条数
    pub created: usize,
    /// 译文有新增的已有词条数
    pub updated: usize,
    /// 合法但没有带来任何变化的行数
    pub unchanged: usize,
    /// 格式错误的行号（从 1 开始，升序）
    pub malformed_lines: Vec<usize>,
    /// 是否被取消
    pub cancelled: bool,
}

impl ImportReport {
    fn new(run_id: Uuid, total_lines: usize) -> Self {
        Self {
            run_id,
            total_lines,
            processed_lines: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            malformed_lines: Vec::new(),
            cancelled: false,
        }
    }

    /// 面向用户的唯一诊断信息：以逗号分隔的格式错误行号
    ///
    /// 没有格式错误的行时返回 `None`。
    pub fn diagnostic(&self) -> Option<String> {
        if self.malformed_lines.is_empty() {
            return None;
        }

        Some(
            self.malformed_lines
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    fn record(&mut self, change: LineChange) {
        match change {
            LineChange { created: true, .. } => self.created += 1,
            LineChange { rewritten: true, .. } => self.updated += 1,
            _ => self.unchanged += 1,
        }
    }
}

/// 单行合并的结果
#[derive(Debug, Clone, Copy)]
struct LineChange {
    created: bool,
    rewritten: bool,
}

// ============================================================
// Importer - 导入流程
// ============================================================

/// 导入执行器
///
/// 同步执行，调用期间独占调用线程。并发保护由 [`ImportService`] 负责。
pub struct Importer<'a> {
    storage: &'a Storage,
    diagnostics: &'a Diagnostics,
}

impl<'a> Importer<'a> {
    pub fn new(storage: &'a Storage, diagnostics: &'a Diagnostics) -> Self {
        Self {
            storage,
            diagnostics,
        }
    }

    /// 执行导入
    ///
    /// # Arguments
    /// * `source` - 按行拆分的数据源
    /// * `on_progress` - 每处理完一行调用一次
    /// * `cancel` - 取消标记，行与行之间检查
    pub fn run<F>(
        &self,
        source: &ImportSource,
        mut on_progress: F,
        cancel: &CancelFlag,
    ) -> ImportResult<ImportReport>
    where
        F: FnMut(ImportProgress),
    {
        let run_id = Uuid::new_v4();
        let total = source.len();
        let span = tracing::info_span!("import", %run_id, table = %self.storage.table());
        let _enter = span.enter();

        let mut report = ImportReport::new(run_id, total);
        self.diagnostics
            .info(format!("import started: {total} lines into `{}`", self.storage.table()));

        for (line_no, line) in source.numbered_lines() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                self.diagnostics.warn(format!(
                    "import cancelled after {} of {total} lines",
                    report.processed_lines
                ));
                break;
            }

            match parse_line(line) {
                Err(Malformed) => {
                    tracing::debug!(line = line_no, "malformed line");
                    report.malformed_lines.push(line_no);
                }
                Ok(parsed) => {
                    let change = self.apply(&parsed).map_err(|source| {
                        self.diagnostics.error(format!(
                            "import aborted at line {line_no} (`{}`): {source}",
                            parsed.word
                        ));
                        ImportError::Store {
                            line: line_no,
                            source,
                        }
                    })?;
                    report.record(change);
                }
            }

            report.processed_lines = line_no;
            on_progress(ImportProgress {
                processed: line_no,
                total,
            });
        }

        if let Some(lines) = report.diagnostic() {
            self.diagnostics.warn(format!("malformed lines: {lines}"));
        }

        self.diagnostics.info(format!(
            "import finished: {} processed, {} created, {} updated, {} unchanged, {} malformed",
            report.processed_lines,
            report.created,
            report.updated,
            report.unchanged,
            report.malformed_lines.len()
        ));

        Ok(report)
    }

    /// 在一个事务中合并单行
    ///
    /// 合并结果与现有译文相同时不改写该行。
    fn apply(&self, parsed: &ParsedLine) -> StorageResult<LineChange> {
        self.storage.transaction(|conn| {
            let repo = EntryRepositoryRef::new(conn, self.storage.queries());

            let created = repo.ensure_exists(&parsed.word)?;
            let existing = repo.get_translations(&parsed.word)?;
            let stored = existing.len();
            let (merged, added) = merge_translations(existing, &parsed.translations);

            // 新增译文，或已存重复项被合并
            let rewritten = added > 0 || merged.len() != stored;
            if rewritten {
                repo.set_translations(&parsed.word, &merged)?;
            }

            Ok(LineChange { created, rewritten })
        })
    }
}

// ============================================================
// 测试
// ============================================================
