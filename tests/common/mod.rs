#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use danci_lexicon::diagnostics::Diagnostics;
use danci_lexicon::import::{CancelFlag, ImportReport, ImportService, ImportSource};
use danci_lexicon::storage::{Storage, TableName};

/// On-disk store inside a temporary directory.
pub struct TestStore {
    pub dir: TempDir,
    pub storage: Arc<Storage>,
    pub diagnostics: Diagnostics,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = Storage::open(dir.path().join("lexicon.db"), TableName::default())
            .expect("open storage");

        Self {
            dir,
            storage: Arc::new(storage),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn importer(&self) -> ImportService {
        ImportService::new(Arc::clone(&self.storage), self.diagnostics.clone())
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write import file");
        path
    }

    pub fn import_text(&self, text: &str) -> ImportReport {
        self.importer()
            .run(&ImportSource::from_text(text), |_| {}, &CancelFlag::new())
            .expect("import")
    }

    /// Every (word, translations) pair, ordered by word.
    pub fn snapshot(&self) -> Vec<(String, Vec<String>)> {
        let repo = self.storage.entries();
        repo.search("")
            .expect("list words")
            .into_iter()
            .map(|word| {
                let translations = repo.get_translations(&word).expect("read translations");
                (word, translations)
            })
            .collect()
    }

    pub fn corrupt(&self, word: &str, raw: &str) {
        let conn = self.storage.connection();
        let conn = conn.lock().expect("lock connection");
        conn.execute(
            "UPDATE dictionary SET translations = ?2 WHERE word = ?1",
            [word, raw],
        )
        .expect("corrupt row");
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
