use std::fs;
use std::path::PathBuf;

use indoc::indoc;
use locsync::{FormatOptions, Indent, KeyPath, LocalizationFolder, ResourceNode};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn populate_loads_files_and_registers_missing_languages() {
    let dir = TempDir::new().unwrap();
    let en = write(&dir, "en.json", r#"{"title": "Title"}"#);
    let de = write(&dir, "de.json", r#"{"title": "Titel"}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![en.clone(), de.clone()], "en", false);
    folder
        .populate(&["fr".to_string(), "de".to_string()])
        .unwrap();

    let ids = folder.file_ids();
    assert_eq!(ids, vec![en, de.clone(), dir.path().join("fr.json")]);
    assert_eq!(folder.language_of(&de), Some("de"));
    assert_eq!(
        folder.primary_tree().and_then(|t| t.get("title")).and_then(|n| n.as_leaf()),
        Some("Title")
    );
    assert!(folder.target_tree(&dir.path().join("fr.json")).unwrap().is_empty());
}

#[test]
fn populate_reports_invalid_files_by_path() {
    let dir = TempDir::new().unwrap();
    let broken = write(&dir, "en.json", r#"{"count": 3}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![broken], "en", false);
    let err = folder.populate(&[]).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("en.json"), "{message}");
    assert!(message.contains("count"), "{message}");
}

#[test]
fn commit_in_report_mode_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let en = write(&dir, "en.json", r#"{"b": "B", "a": "A"}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![en.clone()], "en", true);
    folder.populate(&["fr".to_string()]).unwrap();
    let changed = folder.commit(&FormatOptions::default()).unwrap();

    assert_eq!(changed, vec![en.clone(), dir.path().join("fr.json")]);
    assert_eq!(fs::read_to_string(&en).unwrap(), r#"{"b": "B", "a": "A"}"#);
    assert!(!dir.path().join("fr.json").exists());
}

#[test]
fn commit_writes_sorted_output_and_detects_no_change() {
    let dir = TempDir::new().unwrap();
    let formatted = indoc! {r#"
        {
            "a": "A",
            "b": "B"
        }"#};
    let en = write(&dir, "en.json", formatted);
    let de = write(&dir, "de.json", r#"{"b":"B","a":"A"}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![en, de.clone()], "en", false);
    folder.populate(&[]).unwrap();
    let changed = folder.commit(&FormatOptions::default()).unwrap();

    assert_eq!(changed, vec![de.clone()]);
    assert_eq!(fs::read_to_string(&de).unwrap(), formatted);
}

#[test]
fn commit_honours_format_options() {
    let dir = TempDir::new().unwrap();
    let en = write(&dir, "en.json", r#"{"a": "A"}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![en.clone()], "en", false);
    folder.populate(&[]).unwrap();
    let options = FormatOptions {
        indent: Indent::Spaces(2),
        final_newline: true,
        ..FormatOptions::default()
    };
    folder.commit(&options).unwrap();

    assert_eq!(fs::read_to_string(&en).unwrap(), "{\n  \"a\": \"A\"\n}\n");
}

#[test]
fn apply_translations_overwrites_and_creates_leaves() {
    let dir = TempDir::new().unwrap();
    let de = write(&dir, "de.json", r#"{"menu": {"open": "Open"}}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![de.clone()], "en", true);
    folder.populate(&[]).unwrap();
    folder.apply_translations(
        &de,
        vec![
            (KeyPath::new(["menu", "open"]), "Öffnen".to_string()),
            (KeyPath::new(["menu", "close"]), "Schließen".to_string()),
        ],
    );

    let menu = folder.target_tree(&de).unwrap()["menu"].as_subtree().unwrap();
    assert_eq!(menu.get("open"), Some(&ResourceNode::leaf("Öffnen")));
    assert_eq!(menu.get("close"), Some(&ResourceNode::leaf("Schließen")));
}

#[test]
fn utf8_bom_is_not_written_back() {
    let dir = TempDir::new().unwrap();
    let en = dir.path().join("en.json");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"{\"a\": \"A\"}");
    fs::write(&en, bytes).unwrap();

    let mut folder = LocalizationFolder::new(dir.path(), vec![en.clone()], "en", false);
    folder.populate(&[]).unwrap();
    let changed = folder.commit(&FormatOptions::default()).unwrap();

    assert_eq!(changed, vec![en.clone()]);
    assert!(fs::read_to_string(&en).unwrap().starts_with('{'));
}

#[test]
fn primary_language_is_never_created() {
    let dir = TempDir::new().unwrap();
    let de = write(&dir, "de.json", r#"{"a": "A"}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![de], "en", false);
    folder.populate(&["en".to_string(), "fr".to_string()]).unwrap();

    assert!(folder.primary_tree().is_none());
    assert_eq!(folder.file_ids().len(), 2);
}

#[test]
fn created_language_keeps_the_requested_file_name() {
    let dir = TempDir::new().unwrap();
    let en = write(&dir, "en.json", r#"{"a": "A"}"#);
    let pt = write(&dir, "pt_br.json", r#"{"a": "A"}"#);

    let mut folder = LocalizationFolder::new(dir.path(), vec![en.clone()], "en", false);
    folder
        .populate(&["pt-BR".to_string(), " zh-Hant ".to_string()])
        .unwrap();
    let created = dir.path().join("zh-Hant.json");
    assert_eq!(
        folder.file_ids(),
        vec![en.clone(), dir.path().join("pt-BR.json"), created.clone()]
    );
    assert_eq!(folder.language_of(&created), Some("zh_hant"));

    let mut folder = LocalizationFolder::new(dir.path(), vec![en.clone(), pt.clone()], "en", false);
    folder.populate(&["pt-BR".to_string()]).unwrap();
    assert_eq!(folder.file_ids(), vec![en, pt]);
}
