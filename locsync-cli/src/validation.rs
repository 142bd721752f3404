use std::path::Path;

use locsync::Indent;
use unic_langid::LanguageIdentifier;

/// Validate output directory exists or can be created
pub fn validate_output_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if path_obj.is_dir() {
        return Err(format!("Output path is a directory: {}", path));
    }
    if let Some(parent) = path_obj.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        return Err(format!("Cannot create output directory: {}", e));
    }

    Ok(())
}

/// Validate a language id as used in file names (`en`, `pt_BR`, `zh-Hant`).
pub fn validate_language_code(lang: &str) -> Result<(), String> {
    if lang.trim().is_empty() {
        return Err("Language code cannot be empty".to_string());
    }

    match lang.trim().replace('_', "-").parse::<LanguageIdentifier>() {
        Ok(_) => Ok(()),
        Err(_) => Err(format!(
            "Invalid language code format: {}. Expected valid BCP 47 language identifier",
            lang
        )),
    }
}

/// Validate the `--space` value: a number of spaces or a literal indent string.
pub fn validate_indent(raw: &str) -> Result<Indent, String> {
    if raw.is_empty() {
        return Ok(Indent::Spaces(0));
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        return Ok(Indent::parse(raw));
    }
    if raw.chars().all(char::is_whitespace) {
        return Ok(Indent::parse(raw));
    }
    Err(format!(
        "Invalid indentation: {:?}. Use a number of spaces or a whitespace string",
        raw
    ))
}
