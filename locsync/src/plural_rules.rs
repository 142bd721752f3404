use std::collections::{BTreeMap, BTreeSet, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use unic_langid::LanguageIdentifier;

use crate::types::PluralCategory;

/// Placeholder substituted with a word stem inside a suffix template.
pub const PLACEHOLDER: &str = "key";

lazy_static! {
    /// Static mapping from base language subtag → plural categories (CLDR‑style, cardinals).
    static ref CATEGORY_TABLE: BTreeMap<&'static str, BTreeSet<PluralCategory>> = {
        use PluralCategory::*;
        let mut m: BTreeMap<&'static str, BTreeSet<PluralCategory>> = BTreeMap::new();

        fn s(items: &[PluralCategory]) -> BTreeSet<PluralCategory> {
            items.iter().cloned().collect()
        }

        // One/Other
        for code in [
            "en","de","nl","sv","da","nb","nn","no","is","fi","et","fa","hi","bn","gu",
            "ta","te","kn","ml","mr","it","es","pt","mk","el","eu","gl","af","sw","ur",
            "fil","tl","tr","id","ms","fr","hy","kab","ca","bg","hu","az","ka","sq","eo"
        ] {
            m.insert(code, s(&[One, Other]));
        }

        // Only Other
        for code in ["ja","zh","ko","th","vi","km","lo","my","yue","jv","su","bo","dz"] {
            m.insert(code, s(&[Other]));
        }

        // Slavic (Russian group): one, few, many, other
        for code in ["ru","uk","be","sr","hr","bs","sh","pl"] {
            m.insert(code, s(&[One, Few, Many, Other]));
        }

        for code in ["cs","sk","lt","ro"] {
            m.insert(code, s(&[One, Few, Other]));
        }

        m.insert("sl", s(&[One, Two, Few, Other]));
        m.insert("lv", s(&[Zero, One, Other]));
        m.insert("ga", s(&[One, Two, Few, Many, Other]));
        m.insert("ar", s(&[Zero, One, Two, Few, Many, Other]));

        // Hebrew (legacy code iw also maps here)
        for code in ["he","iw"] {
            m.insert(code, s(&[One, Two, Many, Other]));
        }

        m
    };

    static ref STANDARD: PluralFormsTable = PluralFormsTable::from_categories(&CATEGORY_TABLE);

    static ref EMPTY: PluralFormSet = PluralFormSet::default();

    /// The `_N` numeric and `_plural` conventions, stripped when no template suffix matches.
    static ref CONVENTIONAL_SUFFIX: Regex = Regex::new(r"_(plural|\d+)$").unwrap();
}

/// Ordered suffix templates for one language, e.g. `["key", "key_plural"]`.
///
/// An empty set means the language is unknown: keys are then treated
/// literally and never restructured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluralFormSet {
    templates: Vec<String>,
}

impl PluralFormSet {
    pub fn new<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PluralFormSet {
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }

    /// Derives templates from CLDR categories.
    ///
    /// `{other}` gives `["key"]`, `{one, other}` gives `["key", "key_plural"]`,
    /// anything richer gives `"key"` for `one` and `key_<category>` for the rest.
    pub fn from_categories(categories: &BTreeSet<PluralCategory>) -> Self {
        use PluralCategory::*;

        if categories.is_empty() {
            return PluralFormSet::default();
        }
        if categories.len() == 1 {
            return PluralFormSet::new([PLACEHOLDER]);
        }
        if categories.len() == 2 && categories.contains(&One) && categories.contains(&Other) {
            return PluralFormSet::new([PLACEHOLDER.to_string(), format!("{PLACEHOLDER}_plural")]);
        }

        let mut templates = Vec::with_capacity(categories.len());
        if categories.contains(&One) {
            templates.push(PLACEHOLDER.to_string());
        }
        for category in categories.iter().filter(|c| **c != One) {
            templates.push(format!("{PLACEHOLDER}_{}", category.as_str()));
        }
        PluralFormSet { templates }
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// One template is the bare stem.
    pub fn has_singular_form(&self) -> bool {
        self.templates.iter().any(|t| t == PLACEHOLDER)
    }

    /// A single key is used for every count.
    pub fn has_only_one_form(&self) -> bool {
        self.templates.len() == 1
    }

    /// Same size and same members, in any order.
    pub fn same_scheme(&self, other: &PluralFormSet) -> bool {
        self.templates.len() == other.templates.len()
            && self.templates.iter().all(|t| other.templates.contains(t))
    }

    /// Non-empty suffixes, i.e. templates with the placeholder removed.
    pub fn suffixes(&self) -> impl Iterator<Item = String> + '_ {
        self.templates
            .iter()
            .map(|t| t.replacen(PLACEHOLDER, "", 1))
            .filter(|s| !s.is_empty())
    }

    /// `key` ends with one of the non-empty suffixes.
    pub fn matches_plural_suffix(&self, key: &str) -> bool {
        self.suffixes().any(|suffix| key.ends_with(&suffix))
    }

    /// Every form of `stem`, in template order.
    pub fn forms_for(&self, stem: &str) -> Vec<String> {
        self.templates
            .iter()
            .map(|t| t.replacen(PLACEHOLDER, stem, 1))
            .collect()
    }

    pub fn is_form_of(&self, key: &str, stem: &str) -> bool {
        self.templates
            .iter()
            .any(|t| t.replacen(PLACEHOLDER, stem, 1) == key)
    }

    /// Whether `key` is a form of any stem in `stems`. Costs one check per
    /// template, independent of how many stems there are.
    pub fn is_form_of_any(&self, key: &str, stems: &HashSet<&str>) -> bool {
        self.templates.iter().any(|t| match t.split_once(PLACEHOLDER) {
            Some((prefix, suffix)) => key
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .is_some_and(|stem| stems.contains(stem)),
            None => t == key && !stems.is_empty(),
        })
    }

    /// Longest non-empty suffix of this set that `key` ends with.
    fn longest_matching_suffix(&self, key: &str) -> Option<String> {
        self.suffixes()
            .filter(|suffix| key.ends_with(suffix.as_str()))
            .max_by_key(|suffix| suffix.len())
    }
}

/// Strips the longest template suffix from any of `sets`, falling back to
/// the `_N` and `_plural` conventions. Returns `key` unchanged otherwise.
pub fn stem_of<'k>(key: &'k str, sets: &[&PluralFormSet]) -> &'k str {
    let longest = sets
        .iter()
        .filter_map(|set| set.longest_matching_suffix(key))
        .max_by_key(|suffix| suffix.len());

    if let Some(suffix) = longest {
        return &key[..key.len() - suffix.len()];
    }
    match CONVENTIONAL_SUFFIX.find(key) {
        Some(m) => &key[..m.start()],
        None => key,
    }
}

/// Normalizes a language id the way file names are normalized: lowercase,
/// hyphens folded into underscores.
pub fn normalize_language(code: &str) -> String {
    code.trim().replace('-', "_").to_ascii_lowercase()
}

/// Immutable lookup of plural suffix templates by language code.
#[derive(Debug, Clone, Default)]
pub struct PluralFormsTable {
    forms: BTreeMap<String, PluralFormSet>,
}

impl PluralFormsTable {
    /// The built-in table, constructed once per process.
    pub fn standard() -> &'static PluralFormsTable {
        &*STANDARD
    }

    pub fn from_categories(categories: &BTreeMap<&'static str, BTreeSet<PluralCategory>>) -> Self {
        PluralFormsTable {
            forms: categories
                .iter()
                .map(|(code, cats)| (code.to_string(), PluralFormSet::from_categories(cats)))
                .collect(),
        }
    }

    /// Builds a table from explicit templates, keyed by normalized code.
    pub fn from_templates<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, PluralFormSet)>,
        K: AsRef<str>,
    {
        PluralFormsTable {
            forms: entries
                .into_iter()
                .map(|(code, set)| (normalize_language(code.as_ref()), set))
                .collect(),
        }
    }

    /// Exact match first, then the base language, then the empty set.
    pub fn lookup(&self, code: &str) -> &PluralFormSet {
        let normalized = normalize_language(code);
        if let Some(set) = self.forms.get(&normalized) {
            return set;
        }
        base_language(&normalized)
            .and_then(|base| self.forms.get(&base))
            .unwrap_or(&*EMPTY)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }
}

fn base_language(normalized: &str) -> Option<String> {
    if !normalized.contains('_') {
        return None;
    }
    let tag = normalized.replace('_', "-");
    match tag.parse::<LanguageIdentifier>() {
        Ok(id) => Some(id.language.as_str().to_string()),
        Err(_) => normalized.split('_').next().map(str::to_string),
    }
}
