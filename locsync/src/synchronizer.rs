//! Plural-aware synchronization of one target tree against the primary tree.
//!
//! The primary tree decides which keys exist. For every level the merge pass
//! walks the primary keys in document order (copying, recursing, reporting
//! type mismatches, and rewriting plural forms the target language does not
//! use), then the prune pass drops target keys that correspond to nothing in
//! the primary tree.
//!
//! Plural families are recognized purely by key names: a key that merely
//! happens to end in `_plural` (or another suffix of the language) is treated
//! as a plural form.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    plural_rules::{PluralFormSet, PluralFormsTable, stem_of},
    recorder::ChangeRecorder,
    types::{KeyPath, ResourceNode, Tree},
};

/// Options controlling sync behavior.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncOptions {
    /// Insert `""` for new keys instead of the primary-language value.
    pub new_keys_empty: bool,
}

/// Everything a pass needs besides the trees and the recorder.
#[derive(Debug, Clone)]
pub struct SyncContext<'a> {
    pub primary_language: &'a str,
    pub target_language: &'a str,
    pub plural_table: &'a PluralFormsTable,
    pub options: SyncOptions,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        primary_language: &'a str,
        target_language: &'a str,
        plural_table: &'a PluralFormsTable,
    ) -> Self {
        SyncContext {
            primary_language,
            target_language,
            plural_table,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }
}

/// Synchronizes `target` with `primary`, recording every decision in `recorder`.
///
/// `target` is mutated in place; `primary` is only read.
pub fn synchronize(
    primary: &Tree,
    target: &mut Tree,
    context: &SyncContext<'_>,
    recorder: &mut ChangeRecorder,
) {
    let pass = Pass {
        primary_forms: context.plural_table.lookup(context.primary_language),
        target_forms: context.plural_table.lookup(context.target_language),
        new_keys_empty: context.options.new_keys_empty,
    };
    debug!(
        primary = context.primary_language,
        target = context.target_language,
        restructures = pass.restructures(),
        "synchronizing"
    );
    pass.sync_level(primary, target, &KeyPath::root(), recorder);
}

struct Pass<'a> {
    primary_forms: &'a PluralFormSet,
    target_forms: &'a PluralFormSet,
    new_keys_empty: bool,
}

impl Pass<'_> {
    /// Plural forms are rewritten only between two known, differing schemes.
    fn restructures(&self) -> bool {
        !self.primary_forms.is_empty()
            && !self.target_forms.is_empty()
            && !self.primary_forms.same_scheme(self.target_forms)
    }

    fn new_value(&self, value: &str) -> String {
        if self.new_keys_empty {
            String::new()
        } else {
            value.to_string()
        }
    }

    fn sync_level(
        &self,
        primary: &Tree,
        target: &mut Tree,
        parent: &KeyPath,
        recorder: &mut ChangeRecorder,
    ) {
        for (key, primary_value) in primary {
            self.merge_key(primary, target, key, primary_value, parent, recorder);
        }
        self.prune(primary, target, parent, recorder);
    }

    fn merge_key(
        &self,
        primary: &Tree,
        target: &mut Tree,
        key: &str,
        primary_value: &ResourceNode,
        parent: &KeyPath,
        recorder: &mut ChangeRecorder,
    ) {
        let path = parent.child(key);
        let target_kind = match target.get(key) {
            Some(node) => node.kind(),
            None => {
                self.copy_value(primary, target, key, primary_value, &path, recorder);
                return;
            }
        };

        match primary_value {
            ResourceNode::Subtree(primary_sub) => {
                if let Some(ResourceNode::Subtree(target_sub)) = target.get_mut(key) {
                    self.sync_level(primary_sub, target_sub, &path, recorder);
                    return;
                }
            }
            ResourceNode::Leaf(_) if target_kind == primary_value.kind() => {
                if self.restructures()
                    && self.primary_forms.matches_plural_suffix(key)
                    && !self.target_forms.matches_plural_suffix(key)
                {
                    debug!(key = %path, "replacing plural form unused by the target language");
                    if let Some(removed) = target.shift_remove(key) {
                        recorder.node_removed(&path, &removed);
                    }
                    let stem = self.copy_stem(key);
                    self.synthesize_plurals(primary, target, key, stem, parent, recorder);
                }
                return;
            }
            ResourceNode::Leaf(_) => {}
        }

        debug!(key = %path, "type mismatch, leaving target value untouched");
        let display = path.to_string();
        let expected = primary_value.kind();
        recorder.record_error(move |file| {
            format!(
                "{file} contains type mismatch on key {display} (primary has {expected}, found {target_kind})"
            )
        });
    }

    fn copy_value(
        &self,
        primary: &Tree,
        target: &mut Tree,
        key: &str,
        primary_value: &ResourceNode,
        path: &KeyPath,
        recorder: &mut ChangeRecorder,
    ) {
        match primary_value {
            ResourceNode::Subtree(primary_sub) => {
                if !recorder.has_root_key(path) {
                    recorder.key_added(path.clone());
                }
                let mut created = Tree::new();
                self.sync_level(primary_sub, &mut created, path, recorder);
                target.insert(key.to_string(), ResourceNode::Subtree(created));
            }
            ResourceNode::Leaf(value) => {
                if self.restructures() && self.is_plural_family_member(key, primary) {
                    let stem = self.copy_stem(key);
                    if !self.target_family_complete(target, stem) {
                        let parent = parent_of(path);
                        self.synthesize_plurals(primary, target, key, stem, &parent, recorder);
                    }
                    return;
                }
                target.insert(key.to_string(), ResourceNode::Leaf(self.new_value(value)));
                if !recorder.has_root_key(path) {
                    recorder.key_added(path.clone());
                }
            }
        }
    }

    /// Whether `key` (a leaf of `siblings`) denotes one count variant of a stem
    /// in the primary language.
    fn is_plural_family_member(&self, key: &str, siblings: &Tree) -> bool {
        let forms = self.primary_forms;
        if forms.is_empty() {
            return false;
        }
        if forms.has_only_one_form() || forms.matches_plural_suffix(key) {
            return true;
        }
        if !forms.has_singular_form() {
            return false;
        }
        forms
            .forms_for(key)
            .iter()
            .any(|form| form != key && siblings.contains_key(form.as_str()))
    }

    fn copy_stem<'k>(&self, key: &'k str) -> &'k str {
        stem_of(key, &[self.primary_forms])
    }

    fn target_family_complete(&self, target: &Tree, stem: &str) -> bool {
        self.target_forms
            .forms_for(stem)
            .iter()
            .all(|form| target.contains_key(form))
    }

    /// Writes every missing target-language form of `stem` into `target`.
    fn synthesize_plurals(
        &self,
        primary: &Tree,
        target: &mut Tree,
        key: &str,
        stem: &str,
        parent: &KeyPath,
        recorder: &mut ChangeRecorder,
    ) {
        let fill = self.fill_value(primary, key, stem);
        for form in self.target_forms.forms_for(stem) {
            if target.contains_key(&form) {
                continue;
            }
            let path = parent.child(&form);
            target.insert(form, ResourceNode::Leaf(self.new_value(&fill)));
            if !recorder.has_root_key(&path) {
                recorder.key_added(path);
            }
        }
    }

    /// Picks the value copied into synthesized plural forms. Suffixed primary
    /// forms are preferred because they usually carry the count placeholder.
    fn fill_value(&self, primary: &Tree, key: &str, stem: &str) -> String {
        let leaf = |name: &str| primary.get(name).and_then(ResourceNode::as_leaf);

        if !self.primary_forms.has_only_one_form() {
            let plural = self
                .primary_forms
                .forms_for(stem)
                .into_iter()
                .filter(|form| form != stem)
                .find_map(|form| leaf(&form));
            if let Some(value) = plural {
                return value.to_string();
            }
        }
        leaf(stem)
            .or_else(|| leaf(key))
            .unwrap_or_default()
            .to_string()
    }

    fn prune(
        &self,
        primary: &Tree,
        target: &mut Tree,
        parent: &KeyPath,
        recorder: &mut ChangeRecorder,
    ) {
        let mut stale: Vec<String> = target
            .keys()
            .filter(|key| !primary.contains_key(key.as_str()))
            .cloned()
            .collect();
        if stale.is_empty() {
            return;
        }
        let stems = self.plural_family_stems(primary);
        stale.retain(|key| !self.is_valid_mapped_plural_form(key, &stems));

        for key in stale {
            if let Some(removed) = target.shift_remove(&key) {
                recorder.node_removed(&parent.child(&key), &removed);
            }
        }
    }

    /// Stems of the primary leaves at this level that belong to a plural family.
    fn plural_family_stems<'p>(&self, primary: &'p Tree) -> HashSet<&'p str> {
        primary
            .iter()
            .filter(|(key, value)| value.is_leaf() && self.is_plural_family_member(key, primary))
            .map(|(key, _)| self.copy_stem(key))
            .collect()
    }

    /// A target-only key survives when it is the target-language spelling of
    /// a plural family that exists in the primary tree.
    fn is_valid_mapped_plural_form(&self, key: &str, stems: &HashSet<&str>) -> bool {
        if self.target_forms.has_only_one_form() {
            stems.contains(key)
        } else {
            self.target_forms.is_form_of_any(key, stems)
        }
    }
}

fn parent_of(path: &KeyPath) -> KeyPath {
    match path.segments().split_last() {
        Some((_, parents)) => KeyPath::new(parents.iter().cloned()),
        None => KeyPath::root(),
    }
}
