//! Per-file ledger of what a synchronization pass did.

use std::fmt;

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::types::{KeyPath, ResourceNode, collect_leaves};

type ErrorMessage = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Records added and removed key paths and structural errors for one target file.
///
/// A new recorder is created for every file; nothing is shared between files.
pub struct ChangeRecorder {
    file: String,
    added: IndexSet<KeyPath>,
    removed: IndexSet<KeyPath>,
    errors: Vec<ErrorMessage>,
}

impl ChangeRecorder {
    pub fn new(file: impl Into<String>) -> Self {
        ChangeRecorder {
            file: file.into(),
            added: IndexSet::new(),
            removed: IndexSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn key_added(&mut self, path: KeyPath) {
        info!(file = %self.file, key = %path, "key added");
        self.added.insert(path);
    }

    pub fn key_removed(&mut self, path: KeyPath) {
        info!(file = %self.file, key = %path, "key removed");
        self.removed.insert(path);
    }

    /// Records the removal of `node` found at `path`: one entry per leaf beneath it.
    pub fn node_removed(&mut self, path: &KeyPath, node: &ResourceNode) {
        for (leaf_path, _) in collect_leaves(node, path) {
            self.key_removed(leaf_path);
        }
    }

    /// Stores an error message; the closure receives the file name when the
    /// message is read.
    pub fn record_error<F>(&mut self, message: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.errors.push(Box::new(message));
        warn!(file = %self.file, count = self.errors.len(), "error recorded");
    }

    /// True if `path` or one of its ancestors was already recorded as added.
    pub fn has_root_key(&self, path: &KeyPath) -> bool {
        path.ancestors_inclusive()
            .any(|segments| self.added.contains(&KeyPath::new(segments.iter().cloned())))
    }

    pub fn added_keys(&self) -> Vec<KeyPath> {
        self.added.iter().cloned().collect()
    }

    pub fn removed_keys(&self) -> Vec<KeyPath> {
        self.removed.iter().cloned().collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.iter().map(|message| message(&self.file)).collect()
    }

    pub fn has_any_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn has_any_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Debug for ChangeRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecorder")
            .field("file", &self.file)
            .field("added", &self.added)
            .field("removed", &self.removed)
            .field("errors", &self.errors())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::types::Tree;

    #[test]
    fn test_added_and_removed_keep_first_seen_order() {
        let mut recorder = ChangeRecorder::new("de.json");
        recorder.key_added(KeyPath::new(["b"]));
        recorder.key_added(KeyPath::new(["a"]));
        recorder.key_added(KeyPath::new(["b"]));
        recorder.key_removed(KeyPath::new(["z"]));

        assert_eq!(
            recorder.added_keys(),
            vec![KeyPath::new(["b"]), KeyPath::new(["a"])]
        );
        assert_eq!(recorder.removed_keys(), vec![KeyPath::new(["z"])]);
        assert!(recorder.has_any_changes());
        assert!(!recorder.has_any_errors());
    }

    #[test]
    fn test_has_root_key_checks_ancestors() {
        let mut recorder = ChangeRecorder::new("de.json");
        recorder.key_added(KeyPath::new(["menu"]));

        assert!(recorder.has_root_key(&KeyPath::new(["menu"])));
        assert!(recorder.has_root_key(&KeyPath::new(["menu", "file", "open"])));
        assert!(!recorder.has_root_key(&KeyPath::new(["menus"])));
        assert!(!recorder.has_root_key(&KeyPath::new(["other", "menu"])));
    }

    #[test]
    fn test_subtree_removal_fans_out_to_leaves() {
        let mut inner = Tree::new();
        inner.insert("a".to_string(), ResourceNode::leaf("1"));
        let mut deeper = Tree::new();
        deeper.insert("c".to_string(), ResourceNode::leaf("3"));
        inner.insert("b".to_string(), ResourceNode::Subtree(deeper));

        let mut recorder = ChangeRecorder::new("de.json");
        recorder.node_removed(&KeyPath::new(["old"]), &ResourceNode::Subtree(inner));

        assert_eq!(
            recorder.removed_keys(),
            vec![KeyPath::new(["old", "a"]), KeyPath::new(["old", "b", "c"])]
        );
    }

    #[test]
    fn test_errors_are_formatted_with_file_name() {
        let mut recorder = ChangeRecorder::new("locales/fr.json");
        recorder.record_error(|file| format!("{file} contains type mismatch on key title"));

        assert!(recorder.has_any_errors());
        assert!(!recorder.has_any_changes());
        assert_eq!(
            recorder.errors(),
            vec!["locales/fr.json contains type mismatch on key title".to_string()]
        );
    }

    #[test]
    fn test_error_message_is_formatted_only_when_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut recorder = ChangeRecorder::new("fr.json");
        recorder.record_error(move |file| {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("{file} contains type mismatch on key title")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        recorder.errors();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
