//! The set of language files living in one directory.
//!
//! A [`LocalizationFolder`] loads every file once, remembers a fingerprint of
//! what was on disk, lets the caller mutate the trees, and finally writes the
//! trees back (or, in report mode, only computes which files would change).

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    error::Error,
    json::{FormatOptions, decode_bytes, parse_tree, render_tree},
    plural_rules::normalize_language,
    types::{KeyPath, ResourceNode, Tree, node_at_mut},
};

/// Language id derived from a file name: the stem, lowercased, `-` folded into `_`.
pub fn language_from_path<P: AsRef<Path>>(path: P) -> String {
    let stem = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    normalize_language(stem)
}

/// MD5 fingerprint of serialized file content.
pub fn fingerprint(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

#[derive(Debug)]
struct LocaleFile {
    path: PathBuf,
    language: String,
    tree: Tree,
    /// `None` for files that did not exist before this run.
    fingerprint: Option<String>,
}

/// All language files of one directory.
#[derive(Debug)]
pub struct LocalizationFolder {
    directory: PathBuf,
    primary_language: String,
    report_mode: bool,
    pending: Vec<PathBuf>,
    files: Vec<LocaleFile>,
}

impl LocalizationFolder {
    pub fn new<P: Into<PathBuf>>(
        directory: P,
        files: Vec<PathBuf>,
        primary_language: &str,
        report_mode: bool,
    ) -> Self {
        LocalizationFolder {
            directory: directory.into(),
            primary_language: normalize_language(primary_language),
            report_mode,
            pending: files,
            files: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reads and parses every file, then registers an empty tree for each
    /// expected language that has no file yet. The primary language is never
    /// registered this way.
    pub fn populate(&mut self, expected_languages: &[String]) -> Result<(), Error> {
        for path in std::mem::take(&mut self.pending) {
            let bytes = fs::read(&path)?;
            let text = decode_bytes(&bytes)?;
            let tree = parse_tree(&text).map_err(|e| match e {
                Error::Parse(source) => Error::invalid_resource(format!(
                    "{} is not valid JSON: {}",
                    path.display(),
                    source
                )),
                Error::InvalidResource(message) => {
                    Error::invalid_resource(format!("{}: {}", path.display(), message))
                }
                other => other,
            })?;
            debug!(file = %path.display(), keys = tree.len(), "loaded");
            self.files.push(LocaleFile {
                language: language_from_path(&path),
                fingerprint: Some(fingerprint(&bytes)),
                path,
                tree,
            });
        }

        for requested in expected_languages {
            let language = normalize_language(requested);
            // An empty primary would prune every target.
            if language == self.primary_language
                || self.files.iter().any(|f| f.language == language)
            {
                continue;
            }
            // Named as requested; the normalized id only detects existing files.
            let path = self.directory.join(format!("{}.json", requested.trim()));
            info!(file = %path.display(), "registering missing language file");
            self.files.push(LocaleFile {
                path,
                language,
                tree: Tree::new(),
                fingerprint: None,
            });
        }
        Ok(())
    }

    /// Paths of all files, in load order. These are the file ids.
    pub fn file_ids(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn primary_tree(&self) -> Option<&Tree> {
        self.files
            .iter()
            .find(|f| f.language == self.primary_language)
            .map(|f| &f.tree)
    }

    pub fn language_of(&self, id: &Path) -> Option<&str> {
        self.file(id).map(|f| f.language.as_str())
    }

    pub fn target_tree(&self, id: &Path) -> Option<&Tree> {
        self.file(id).map(|f| &f.tree)
    }

    pub fn target_tree_mut(&mut self, id: &Path) -> Option<&mut Tree> {
        self.files
            .iter_mut()
            .find(|f| f.path == id)
            .map(|f| &mut f.tree)
    }

    /// Writes translated strings into the tree of `id`. Paths that no longer
    /// point to a string are created or overwritten.
    pub fn apply_translations(&mut self, id: &Path, values: Vec<(KeyPath, String)>) {
        let Some(tree) = self.target_tree_mut(id) else {
            return;
        };
        for (path, value) in values {
            match node_at_mut(tree, &path) {
                Some(node) => *node = ResourceNode::Leaf(value),
                None => insert_leaf(tree, &path, value),
            }
        }
    }

    /// Renders every tree and returns the files whose content differs from
    /// what was loaded. Nothing is written in report mode.
    pub fn commit(&mut self, format: &FormatOptions) -> Result<Vec<PathBuf>, Error> {
        let mut changed = Vec::new();
        for file in &mut self.files {
            let content = render_tree(&file.tree, format)?;
            let new_fingerprint = fingerprint(content.as_bytes());
            if file.fingerprint.as_deref() != Some(new_fingerprint.as_str()) {
                changed.push(file.path.clone());
            }

            if !self.report_mode {
                if let Some(parent) = file.path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&file.path, &content)?;
                debug!(file = %file.path.display(), "written");
            }
            file.fingerprint = Some(new_fingerprint);
        }
        Ok(changed)
    }

    fn file(&self, id: &Path) -> Option<&LocaleFile> {
        self.files.iter().find(|f| f.path == id)
    }
}

fn insert_leaf(tree: &mut Tree, path: &KeyPath, value: String) {
    let Some((last, parents)) = path.segments().split_last() else {
        return;
    };
    let mut current = tree;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| ResourceNode::Subtree(Tree::new()));
        if entry.is_leaf() {
            *entry = ResourceNode::Subtree(Tree::new());
        }
        current = match entry {
            ResourceNode::Subtree(sub) => sub,
            ResourceNode::Leaf(_) => return,
        };
    }
    current.insert(last.clone(), ResourceNode::Leaf(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node_at;

    #[test]
    fn test_language_from_path() {
        assert_eq!(language_from_path("locales/pt-BR.json"), "pt_br");
        assert_eq!(language_from_path("locales/EN.json"), "en");
        assert_eq!(language_from_path("zh_Hant.json"), "zh_hant");
    }

    #[test]
    fn test_fingerprint_is_md5_hex() {
        assert_eq!(fingerprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_insert_leaf_creates_parents() {
        let mut tree = Tree::new();
        insert_leaf(&mut tree, &KeyPath::new(["a", "b"]), "x".to_string());
        assert_eq!(
            node_at(&tree, &KeyPath::new(["a", "b"])).and_then(|n| n.as_leaf()),
            Some("x")
        );
    }
}
