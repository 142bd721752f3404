use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "locsync.toml";

pub const DEFAULT_FILES: &str = "**/locales/*.json";
pub const DEFAULT_EXCLUDE: &str = "**/node_modules/**";
pub const DEFAULT_PRIMARY: &str = "en";

/// Indentation as written in `locsync.toml`: `space = 2` or `space = "\t"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SpaceSetting {
    Width(usize),
    Text(String),
}

impl SpaceSetting {
    pub fn to_raw(&self) -> String {
        match self {
            SpaceSetting::Width(n) => n.to_string(),
            SpaceSetting::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct TranslateConfig {
    pub enabled: Option<bool>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub batch_size: Option<usize>,
    pub max_attempts: Option<usize>,
}

/// Contents of `locsync.toml`. Every field is optional; command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub files: Option<String>,
    pub exclude: Option<Vec<String>>,
    pub primary: Option<String>,
    pub create: Option<Vec<String>>,
    pub space: Option<SpaceSetting>,
    pub line_endings: Option<String>,
    pub final_newline: Option<bool>,
    pub new_keys_empty: Option<bool>,
    pub write_on_error: Option<bool>,
    pub translate: TranslateConfig,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid configuration: {}", e))
    }

    /// Loads `explicit` if given (it must exist), otherwise `locsync.toml` in
    /// `cwd` when present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>), String> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(format!("Config file does not exist: {}", path.display()));
                }
                path.to_path_buf()
            }
            None => {
                let candidate = cwd.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok((FileConfig::default(), None));
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("Cannot read config file '{}': {}", path.display(), e))?;
        let config = Self::parse(&text).map_err(|e| format!("{} ({})", e, path.display()))?;
        Ok((config, Some(path)))
    }
}
