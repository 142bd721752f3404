use std::path::{Path, PathBuf};

use clap::Args;
use locsync::{
    FormatOptions, LineEnding, OpenAiTranslator, RunOptions, RunReport, SyncOptions,
    TranslationPolicy, Translator, run,
};
use serde_json::json;
use tracing::debug;

use crate::config::{DEFAULT_EXCLUDE, DEFAULT_FILES, DEFAULT_PRIMARY, FileConfig};
use crate::path_glob::{discover_files, validate_glob};
use crate::validation::{validate_indent, validate_language_code, validate_output_path};

/// Flags of `locsync sync`.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Glob selecting the language files [default: **/locales/*.json]
    #[arg(short, long, value_name = "GLOB")]
    pub files: Option<String>,

    /// Glob of files to skip; repeatable [default: **/node_modules/**]
    #[arg(short = 'x', long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Primary language, the source of truth for keys [default: en]
    #[arg(short, long, value_name = "LANG")]
    pub primary: Option<String>,

    /// Languages to create in every directory when missing (comma-separated or repeated)
    #[arg(short, long, value_name = "LANG", value_delimiter = ',')]
    pub create: Vec<String>,

    /// Indentation: a number of spaces or a literal string such as a tab [default: 4]
    #[arg(short, long, value_name = "N|STR")]
    pub space: Option<String>,

    /// Line endings of written files: LF or CRLF [default: LF]
    #[arg(short, long, value_name = "LF|CRLF")]
    pub line_endings: Option<String>,

    /// End written files with a newline
    #[arg(long)]
    pub final_newline: bool,

    /// Insert empty strings for new keys instead of primary-language text
    #[arg(long)]
    pub new_keys_empty: bool,

    /// Machine-translate new keys (needs OPENAI_API_KEY)
    #[arg(long)]
    pub translate: bool,

    /// Chat model used for translation
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Report what would change and fail instead of writing
    #[arg(long)]
    pub check: bool,

    /// Write directories even when they contain type mismatches
    #[arg(long)]
    pub write_on_error: bool,

    /// Configuration file [default: ./locsync.toml when present]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a JSON report of the run to this path
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<String>,
}

/// Flags merged with the config file and defaults.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub root: PathBuf,
    pub files: String,
    pub exclude: Vec<String>,
    pub primary: String,
    pub create: Vec<String>,
    pub space: String,
    pub line_endings: String,
    pub final_newline: bool,
    pub new_keys_empty: bool,
    pub translate: bool,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub batch_size: Option<usize>,
    pub max_attempts: Option<usize>,
    pub check: bool,
    pub write_on_error: bool,
    pub report_json: Option<String>,
}

impl SyncSettings {
    pub fn resolve(args: SyncArgs, config: FileConfig, root: &Path) -> Self {
        let translate = config.translate;
        SyncSettings {
            root: root.to_path_buf(),
            files: args
                .files
                .or(config.files)
                .unwrap_or_else(|| DEFAULT_FILES.to_string()),
            exclude: if !args.exclude.is_empty() {
                args.exclude
            } else {
                config
                    .exclude
                    .unwrap_or_else(|| vec![DEFAULT_EXCLUDE.to_string()])
            },
            primary: args
                .primary
                .or(config.primary)
                .unwrap_or_else(|| DEFAULT_PRIMARY.to_string()),
            create: if !args.create.is_empty() {
                args.create
            } else {
                config.create.unwrap_or_default()
            },
            space: args
                .space
                .or_else(|| config.space.map(|s| s.to_raw()))
                .unwrap_or_else(|| "4".to_string()),
            line_endings: args
                .line_endings
                .or(config.line_endings)
                .unwrap_or_else(|| "LF".to_string()),
            final_newline: args.final_newline || config.final_newline.unwrap_or(false),
            new_keys_empty: args.new_keys_empty || config.new_keys_empty.unwrap_or(false),
            translate: args.translate || translate.enabled.unwrap_or(false),
            model: args.model.or(translate.model),
            api_base: args.api_base.or(translate.api_base),
            api_key: translate.api_key,
            batch_size: translate.batch_size,
            max_attempts: translate.max_attempts,
            check: args.check,
            write_on_error: args.write_on_error || config.write_on_error.unwrap_or(false),
            report_json: args.report_json,
        }
    }

    fn run_options(&self) -> Result<RunOptions, String> {
        validate_language_code(&self.primary)?;
        for lang in &self.create {
            validate_language_code(lang)?;
        }
        let line_ending: LineEnding = self.line_endings.parse()?;
        let indent = validate_indent(&self.space)?;

        let mut translation = TranslationPolicy::default();
        if let Some(cap) = self.batch_size {
            translation.batch_size_cap = cap.max(1);
        }
        if let Some(attempts) = self.max_attempts {
            translation.max_attempts = attempts.max(1);
        }

        Ok(RunOptions {
            primary_language: self.primary.clone(),
            create_languages: self.create.clone(),
            check: self.check,
            sync: SyncOptions {
                new_keys_empty: self.new_keys_empty,
            },
            format: FormatOptions {
                indent,
                line_ending,
                final_newline: self.final_newline,
            },
            write_on_error: self.write_on_error,
            translation,
        })
    }

    fn translator(&self) -> Result<Option<OpenAiTranslator>, String> {
        if !self.translate || self.check {
            return Ok(None);
        }
        let translator = match &self.api_key {
            Some(key) => OpenAiTranslator::new(key.clone()),
            None => OpenAiTranslator::from_env(),
        }
        .map_err(|e| e.to_string())?;
        let translator = match &self.model {
            Some(model) => translator.with_model(model.clone()),
            None => translator,
        };
        Ok(Some(match &self.api_base {
            Some(base) => translator.with_api_base(base.clone()),
            None => translator,
        }))
    }
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn write_report(
    path: &str,
    settings: &SyncSettings,
    report: &RunReport,
    verdict: &Result<(), locsync::Error>,
) -> Result<(), String> {
    let added: usize = report.files.iter().map(|f| f.added.len()).sum();
    let removed: usize = report.files.iter().map(|f| f.removed.len()).sum();
    let status = match verdict {
        Ok(()) => json!("ok"),
        Err(e) => json!(e.error_code()),
    };
    let payload = json!({
        "primary": settings.primary,
        "files_glob": settings.files,
        "check": settings.check,
        "status": status,
        "summary": {
            "files": report.files.len(),
            "changed": report.changed_files.len(),
            "added": added,
            "removed": removed,
            "errors": report.errors.len(),
            "has_value_changes": report.has_value_changes,
            "has_format_changes": report.has_format_changes
        },
        "files": report.files,
        "changed_files": report.changed_files,
        "skipped_directories": report.skipped_directories,
        "errors": report.errors
    });

    let text = serde_json::to_string_pretty(&payload)
        .map_err(|e| format!("Failed to serialize report JSON: {}", e))?;
    std::fs::write(path, text).map_err(|e| format!("Failed to write report JSON '{}': {}", path, e))
}

fn print_summary(settings: &SyncSettings, report: &RunReport) {
    for outcome in &report.files {
        if outcome.added.is_empty() && outcome.removed.is_empty() {
            continue;
        }
        println!(
            "{}: +{} -{}{}",
            display_path(&settings.root, &outcome.file),
            outcome.added.len(),
            outcome.removed.len(),
            if outcome.translated > 0 {
                format!(" ({} translated)", outcome.translated)
            } else {
                String::new()
            }
        );
    }
    for dir in &report.skipped_directories {
        println!(
            "Skipped {} (no '{}' file)",
            display_path(&settings.root, dir),
            settings.primary
        );
    }
    for error in &report.errors {
        eprintln!("⚠️  {}", error);
    }

    let verb = if settings.check { "Would update" } else { "Updated" };
    for file in &report.changed_files {
        println!("{}: {}", verb, display_path(&settings.root, file));
    }
    println!("Files processed: {}", report.files.len());
    println!("Files changed: {}", report.changed_files.len());
}

pub fn run_sync_command(settings: SyncSettings) -> Result<(), String> {
    validate_glob(&settings.files)?;
    for pattern in &settings.exclude {
        validate_glob(pattern)?;
    }
    if let Some(report_path) = &settings.report_json {
        validate_output_path(report_path)?;
    }
    let options = settings.run_options()?;
    let translator = settings.translator()?;

    let files = discover_files(
        &settings.root,
        std::slice::from_ref(&settings.files),
        &settings.exclude,
    )?;
    debug!(count = files.len(), "discovered files");
    if files.is_empty() {
        println!("No files matched '{}'", settings.files);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {}", e))?;
    let report = runtime
        .block_on(run(
            &files,
            &options,
            translator.as_ref().map(|t| t as &dyn Translator),
        ))
        .map_err(|e| e.to_string())?;

    print_summary(&settings, &report);
    let verdict = report.verdict(settings.check);

    if let Some(report_path) = &settings.report_json {
        write_report(report_path, &settings, &report, &verdict)?;
        println!("Report JSON written: {}", report_path);
    }

    verdict.map_err(|e| e.to_string())?;
    if settings.check {
        println!("✅ All files are in sync");
    } else {
        println!("✅ Sync complete");
    }
    Ok(())
}
