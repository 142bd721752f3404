#![forbid(unsafe_code)]
//! Keeps per-language i18next JSON resource files in sync with a primary language.
//!
//! Every directory of language files is synchronized against the file of the
//! primary language: missing keys are copied in, stale keys are removed, and
//! plural families are rewritten to the suffix scheme of each target language
//! (`book`/`book_plural` in English becomes `book`/`book_few`/`book_other` in
//! Czech and a single `book` in Japanese).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use locsync::{ChangeRecorder, PluralFormsTable, SyncContext, json::parse_tree, synchronize};
//!
//! let primary = parse_tree(r#"{"book": "book", "book_plural": "books"}"#)?;
//! let mut target = parse_tree(r#"{"title": "Titel"}"#)?;
//!
//! let context = SyncContext::new("en", "cs", PluralFormsTable::standard());
//! let mut recorder = ChangeRecorder::new("cs.json");
//! synchronize(&primary, &mut target, &context, &mut recorder);
//!
//! assert!(target.contains_key("book_few"));
//! assert!(!target.contains_key("title"));
//! # Ok::<(), locsync::Error>(())
//! ```
//!
//! Whole directory trees are processed with [`orchestrator::run`].

pub mod error;
pub mod folder;
pub mod json;
pub mod orchestrator;
pub mod plural_rules;
pub mod recorder;
pub mod synchronizer;
pub mod translate;
pub mod types;

pub use crate::{
    error::{CheckFailure, Error, ErrorCode},
    folder::LocalizationFolder,
    json::{FormatOptions, Indent, LineEnding},
    orchestrator::{FileOutcome, RunOptions, RunReport, run},
    plural_rules::{PluralFormSet, PluralFormsTable},
    recorder::ChangeRecorder,
    synchronizer::{SyncContext, SyncOptions, synchronize},
    translate::{OpenAiTranslator, TranslationPolicy, TranslationRequest, Translator},
    types::{KeyPath, PluralCategory, ResourceNode, Tree},
};
