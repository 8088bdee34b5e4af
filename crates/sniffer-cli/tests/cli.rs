//! Runs the `sniffer` binary against files in a temporary directory

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn sniffer(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sniffer"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run sniffer")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_list_rules() {
    let temp = TempDir::new().unwrap();
    let output = sniffer(temp.path(), &["--list-rules"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Security.EscapeOutput"));
    assert!(text.contains("Formatting.KeywordCase"));
}

#[test]
fn test_errors_exit_with_two_and_json_lists_them() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("page.php"), "<?php\n/** Page. */\necho $title;\n").unwrap();

    let output = sniffer(temp.path(), &["--no-config", "--format", "json", "page.php"]);
    assert_eq!(output.status.code(), Some(2));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["summary"]["errors"], 1);
    let diagnostic = &json["files"][0]["diagnostics"][0];
    assert_eq!(diagnostic["rule"], "Security.EscapeOutput");
    assert_eq!(diagnostic["code"], "NoEscaping");
    assert_eq!(diagnostic["line"], 3);
}

#[test]
fn test_warnings_only_exit_with_one() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.php"), "<?php\n/** Import. */\nextract($data);\n").unwrap();

    let output = sniffer(temp.path(), &["--no-config", "a.php"]);
    assert_eq!(output.status.code(), Some(1));

    let output = sniffer(temp.path(), &["--no-config", "--no-warnings", "a.php"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_fix_rewrites_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("src").join("view.php");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "<?php\n/** View. */\nIF ($a) { ECHO 'x' ; }\n").unwrap();

    let output = sniffer(temp.path(), &["--no-config", "--fix", "src"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "<?php\n/** View. */\nif ($a) { echo 'x'; }\n"
    );
}

#[test]
fn test_diff_format_leaves_files_alone() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a.php");
    let source = "<?php\n/** A. */\nECHO 'x';\n";
    fs::write(&path, source).unwrap();

    let output = sniffer(temp.path(), &["--no-config", "--format", "diff", "a.php"]);
    let text = stdout(&output);
    assert!(text.contains("-ECHO 'x';"));
    assert!(text.contains("+echo 'x';"));
    assert_eq!(fs::read_to_string(&path).unwrap(), source);
}

#[test]
fn test_config_file_selects_rules_and_excludes_paths() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".sniffer.toml"),
        "[rules]\nenabled = [\"Formatting.KeywordCase\"]\n\n[paths]\nexclude = [\"vendor/\"]\n",
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("vendor")).unwrap();
    fs::write(temp.path().join("vendor/lib.php"), "<?php ECHO $x;").unwrap();
    fs::write(temp.path().join("ok.php"), "<?php echo $x;").unwrap();

    let output = sniffer(temp.path(), &["--format", "json", "."]);
    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["summary"]["files_processed"], 1);
}

#[test]
fn test_unknown_rule_is_an_error() {
    let temp = TempDir::new().unwrap();
    let output = sniffer(temp.path(), &["--no-config", "--rule", "Made.Up", "."]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Made.Up"));
}
