//! Drives a whole run: one [`LocalizationFolder`] per directory, one
//! synchronization pass per file, translation of added keys, then commit.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::{CheckFailure, Error},
    folder::LocalizationFolder,
    json::FormatOptions,
    plural_rules::{PluralFormsTable, normalize_language},
    recorder::ChangeRecorder,
    synchronizer::{SyncContext, SyncOptions, synchronize},
    translate::{TranslationPolicy, Translator, translate_entries},
    types::{KeyPath, Tree, collect_leaves, node_at},
};

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub primary_language: String,
    /// Languages that get a file in every directory, created if missing.
    pub create_languages: Vec<String>,
    /// Report mode: compute everything, write nothing.
    pub check: bool,
    pub sync: SyncOptions,
    pub format: FormatOptions,
    /// Commit directories even when they contain type mismatches.
    pub write_on_error: bool,
    pub translation: TranslationPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            primary_language: "en".to_string(),
            create_languages: Vec::new(),
            check: false,
            sync: SyncOptions::default(),
            format: FormatOptions::default(),
            write_on_error: false,
            translation: TranslationPolicy::default(),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileOutcome {
    pub file: PathBuf,
    pub language: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub errors: Vec<String>,
    pub translated: usize,
}

impl FileOutcome {
    fn from_recorder(file: &Path, language: &str, recorder: &ChangeRecorder) -> Self {
        FileOutcome {
            file: file.to_path_buf(),
            language: language.to_string(),
            added: recorder.added_keys().iter().map(ToString::to_string).collect(),
            removed: recorder.removed_keys().iter().map(ToString::to_string).collect(),
            errors: recorder.errors(),
            translated: 0,
        }
    }
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
    /// Files whose rendered content differs from what was on disk.
    pub changed_files: Vec<PathBuf>,
    pub errors: Vec<String>,
    /// Some key was added or removed.
    pub has_value_changes: bool,
    /// Some file would be rewritten.
    pub has_format_changes: bool,
    /// Directories skipped because they have no primary-language file.
    pub skipped_directories: Vec<PathBuf>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Final status of the run.
    pub fn verdict(&self, check: bool) -> Result<(), Error> {
        if self.has_errors() {
            return Err(Error::UnsafeKeys {
                count: self.errors.len(),
            });
        }
        if check {
            if self.has_value_changes {
                return Err(Error::CheckFailed(CheckFailure::OutOfSync));
            }
            if self.has_format_changes {
                return Err(Error::CheckFailed(CheckFailure::Formatting));
            }
        }
        Ok(())
    }
}

/// Groups files by parent directory, in path order.
pub fn group_by_directory(files: &[PathBuf]) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        let directory = file.parent().map(Path::to_path_buf).unwrap_or_default();
        let group = groups.entry(directory).or_default();
        if !group.contains(file) {
            group.push(file.clone());
        }
    }
    groups
}

/// Strings to translate for the keys added to `target`.
///
/// Each added path expands to the leaves beneath it. The text is the primary
/// value at the same path, or the value already in the target for plural
/// forms the primary language does not have. Empty texts are skipped.
///
/// Request keys are the rendered paths. Two paths that render alike, such as
/// `["a::b"]` and `["a", "b"]`, get a `#N` suffix so neither is lost.
pub fn translation_sources(
    primary: &Tree,
    target: &Tree,
    added: &[KeyPath],
) -> IndexMap<String, (KeyPath, String)> {
    let mut sources = IndexMap::new();
    for path in added {
        let Some(node) = node_at(target, path) else {
            continue;
        };
        for (leaf_path, current) in collect_leaves(node, path) {
            let text = node_at(primary, &leaf_path)
                .and_then(|n| n.as_leaf())
                .map(str::to_string)
                .unwrap_or(current);
            if text.is_empty() {
                continue;
            }
            if let Some(request_key) = request_key(&sources, &leaf_path) {
                sources.insert(request_key, (leaf_path, text));
            }
        }
    }
    sources
}

/// A key for `path` not yet used by another path, or `None` if `path` is
/// already present.
fn request_key(sources: &IndexMap<String, (KeyPath, String)>, path: &KeyPath) -> Option<String> {
    let rendered = path.to_string();
    let mut candidate = rendered.clone();
    let mut n = 1;
    while let Some((existing, _)) = sources.get(&candidate) {
        if existing == path {
            return None;
        }
        n += 1;
        candidate = format!("{rendered}#{n}");
    }
    Some(candidate)
}

/// Synchronizes every directory that `files` live in.
///
/// Type mismatches are collected in the report and do not stop the run;
/// I/O, parse and translation failures abort it.
pub async fn run(
    files: &[PathBuf],
    options: &RunOptions,
    translator: Option<&dyn Translator>,
) -> Result<RunReport, Error> {
    let table = PluralFormsTable::standard();
    let primary_language = normalize_language(&options.primary_language);
    let mut report = RunReport::default();

    for (directory, directory_files) in group_by_directory(files) {
        let mut folder = LocalizationFolder::new(
            &directory,
            directory_files,
            &primary_language,
            options.check,
        );
        folder.populate(&options.create_languages)?;

        let Some(primary) = folder.primary_tree().cloned() else {
            warn!(
                directory = %directory.display(),
                language = %primary_language,
                "no primary language file, skipping directory"
            );
            report.skipped_directories.push(directory);
            continue;
        };

        let mut directory_has_errors = false;
        for id in folder.file_ids() {
            let language = folder.language_of(&id).unwrap_or_default().to_string();
            let mut recorder = ChangeRecorder::new(id.display().to_string());
            let context = SyncContext::new(&primary_language, &language, table)
                .with_options(options.sync.clone());

            let Some(target) = folder.target_tree_mut(&id) else {
                continue;
            };
            synchronize(&primary, target, &context, &mut recorder);

            let mut outcome = FileOutcome::from_recorder(&id, &language, &recorder);
            if let Some(translator) = translator
                && !options.check
                && language != primary_language
                && !recorder.added_keys().is_empty()
            {
                let sources = folder
                    .target_tree(&id)
                    .map(|target| translation_sources(&primary, target, &recorder.added_keys()))
                    .unwrap_or_default();
                let entries: IndexMap<String, String> = sources
                    .iter()
                    .map(|(k, (_, text))| (k.clone(), text.clone()))
                    .collect();
                let translated = translate_entries(
                    translator,
                    &primary_language,
                    &language,
                    &entries,
                    &options.translation,
                )
                .await?;
                let values: Vec<(KeyPath, String)> = translated
                    .into_iter()
                    .filter_map(|(key, value)| sources.get(&key).map(|(path, _)| (path.clone(), value)))
                    .collect();
                outcome.translated = values.len();
                folder.apply_translations(&id, values);
            }

            report.has_value_changes |= recorder.has_any_changes();
            if recorder.has_any_errors() {
                directory_has_errors = true;
                report.errors.extend(recorder.errors());
            }
            report.files.push(outcome);
        }

        if directory_has_errors && !options.check && !options.write_on_error {
            warn!(
                directory = %directory.display(),
                "type mismatches found, leaving directory unwritten"
            );
            continue;
        }
        let changed = folder.commit(&options.format)?;
        for file in &changed {
            info!(file = %file.display(), check = options.check, "changed");
        }
        report.changed_files.extend(changed);
    }

    report.has_format_changes = !report.changed_files.is_empty();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parse_tree;

    #[test]
    fn test_group_by_directory_is_sorted_and_deduplicated() {
        let files = vec![
            PathBuf::from("b/locales/en.json"),
            PathBuf::from("a/locales/de.json"),
            PathBuf::from("a/locales/en.json"),
            PathBuf::from("a/locales/de.json"),
        ];
        let groups = group_by_directory(&files);
        let dirs: Vec<&PathBuf> = groups.keys().collect();
        assert_eq!(
            dirs,
            vec![&PathBuf::from("a/locales"), &PathBuf::from("b/locales")]
        );
        assert_eq!(groups[&PathBuf::from("a/locales")].len(), 2);
    }

    #[test]
    fn test_translation_sources_expand_subtrees_and_fall_back_to_target() {
        let primary = parse_tree(r#"{"menu": {"open": "Open", "close": ""}, "book": "book"}"#).unwrap();
        let target = parse_tree(
            r#"{"menu": {"open": "Open", "close": ""}, "book": "book", "book_few": "book"}"#,
        )
        .unwrap();
        let added = vec![KeyPath::new(["menu"]), KeyPath::new(["book_few"])];

        let sources = translation_sources(&primary, &target, &added);
        let keys: Vec<&String> = sources.keys().collect();
        assert_eq!(keys, vec!["menu::open", "book_few"]);
        assert_eq!(sources["book_few"].1, "book");
    }

    #[test]
    fn test_translation_sources_keep_paths_that_render_alike() {
        let primary = parse_tree(r#"{"a::b": "flat", "a": {"b": "nested"}}"#).unwrap();
        let added = vec![KeyPath::new(["a::b"]), KeyPath::new(["a"])];

        let sources = translation_sources(&primary, &primary, &added);
        assert_eq!(sources.len(), 2);
        assert_eq!(
            sources["a::b"],
            (KeyPath::new(["a::b"]), "flat".to_string())
        );
        assert_eq!(
            sources["a::b#2"],
            (KeyPath::new(["a", "b"]), "nested".to_string())
        );
    }

    #[test]
    fn test_verdict() {
        let mut report = RunReport::default();
        assert!(report.verdict(true).is_ok());

        report.has_format_changes = true;
        assert!(report.verdict(false).is_ok());
        assert!(matches!(
            report.verdict(true),
            Err(Error::CheckFailed(CheckFailure::Formatting))
        ));

        report.has_value_changes = true;
        assert!(matches!(
            report.verdict(true),
            Err(Error::CheckFailed(CheckFailure::OutOfSync))
        ));

        report.errors.push("de.json contains type mismatch on key a".to_string());
        assert!(matches!(report.verdict(false), Err(Error::UnsafeKeys { count: 1 })));
    }
}
