use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;

fn build_set(patterns: &[String]) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| format!("Invalid glob pattern '{}': {}", pat, e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| format!("Failed to build glob set: {}", e))
}

/// Directory part of `pattern` before the first glob meta-character.
fn static_prefix_dir(root: &Path, pattern: &str) -> PathBuf {
    let idx = pattern
        .find(['*', '?', '[', '{'])
        .unwrap_or(pattern.len());
    let prefix = &pattern[..idx];
    let candidate = root.join(prefix);
    if prefix.ends_with('/') || candidate.is_dir() {
        candidate
    } else {
        candidate
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf())
    }
}

/// Strips a leading `./` so relative patterns match walker output.
fn normalize_pattern(pattern: &str) -> String {
    pattern.trim_start_matches("./").to_string()
}

/// Finds files below `root` matching any of `patterns` and none of `excludes`.
///
/// Patterns are relative to `root`. The walk respects `.gitignore`; results
/// are sorted and free of duplicates.
pub fn discover_files(
    root: &Path,
    patterns: &[String],
    excludes: &[String],
) -> Result<Vec<PathBuf>, String> {
    let patterns: Vec<String> = patterns.iter().map(|p| normalize_pattern(p)).collect();
    let excludes: Vec<String> = excludes.iter().map(|p| normalize_pattern(p)).collect();
    let include = build_set(&patterns)?;
    let exclude = build_set(&excludes)?;

    let mut roots: Vec<PathBuf> = Vec::new();
    for pat in &patterns {
        let dir = static_prefix_dir(root, pat);
        if !roots.contains(&dir) {
            roots.push(dir);
        }
    }

    let collected: BTreeSet<PathBuf> = roots
        .par_iter()
        .filter(|dir| dir.is_dir())
        .map(|dir| {
            let mut out = Vec::new();
            let walker = WalkBuilder::new(dir)
                .git_ignore(true)
                .git_exclude(true)
                .hidden(false)
                .parents(true)
                .require_git(false)
                .build();
            for dent in walker.flatten() {
                if !dent.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let Ok(relative) = dent.path().strip_prefix(root) else {
                    continue;
                };
                if include.is_match(relative) && !exclude.is_match(relative) {
                    out.push(dent.path().to_path_buf());
                }
            }
            out
        })
        .flatten()
        .collect();

    Ok(collected.into_iter().collect())
}

/// Checks that `pattern` is a valid glob.
pub fn validate_glob(pattern: &str) -> Result<(), String> {
    Glob::new(pattern)
        .map(|_| ())
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))
}
