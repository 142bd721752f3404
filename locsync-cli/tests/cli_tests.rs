use std::process::Command;

fn locsync_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("locsync"))
}

#[test]
fn test_plurals_lists_templates() {
    let output = locsync_cmd()
        .args(["plurals", "en", "cs", "ja", "tlh"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("en: key, key_plural"), "{stdout}");
    assert!(stdout.contains("cs: key, key_few, key_other"), "{stdout}");
    assert!(stdout.contains("ja: key\n"), "{stdout}");
    assert!(stdout.contains("tlh: unknown"), "{stdout}");
}

#[test]
fn test_plurals_rejects_invalid_code() {
    let output = locsync_cmd().args(["plurals", "12345678901"]).output().unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid language code"));
}

#[test]
fn test_completions() {
    let output = locsync_cmd().args(["completions", "bash"]).output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("locsync"));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    let output = locsync_cmd().output().unwrap();

    assert_eq!(output.status.code(), Some(2));
}
