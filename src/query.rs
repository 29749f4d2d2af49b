//! Interactive lookups: substring search and translation display.

use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::storage::{Storage, StorageError, StorageResult};

#[derive(Clone)]
pub struct QueryService {
    storage: Arc<Storage>,
    diagnostics: Diagnostics,
}

impl QueryService {
    pub fn new(storage: Arc<Storage>, diagnostics: Diagnostics) -> Self {
        Self {
            storage,
            diagnostics,
        }
    }

    /// Words containing `text`, ordered by word.
    ///
    /// Matching is case-insensitive for ASCII letters. An empty `text` lists
    /// every word in the table.
    pub fn search(&self, text: &str) -> StorageResult<Vec<String>> {
        self.storage.entries().search(text).map_err(|e| {
            self.diagnostics.error(format!("search for `{text}` failed: {e}"));
            e
        })
    }

    /// Decoded translations of `word`.
    ///
    /// A row whose stored JSON cannot be decoded yields [`StorageError::Decode`];
    /// it is reported and does not affect any other lookup.
    pub fn select_word(&self, word: &str) -> StorageResult<Vec<String>> {
        self.storage.entries().get_translations(word).map_err(|e| {
            match &e {
                StorageError::Decode { .. } => self.diagnostics.warn(e.to_string()),
                StorageError::NotFound(_) => self.diagnostics.warn(e.to_string()),
                _ => self
                    .diagnostics
                    .error(format!("lookup of `{word}` failed: {e}")),
            }
            e
        })
    }
}

/// One translation per line, the way the viewer shows them.
pub fn format_translations(translations: &[String]) -> String {
    translations
        .iter()
        .map(|t| format!("{t}\n"))
        .collect()
}
