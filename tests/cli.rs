use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use sha2::{Digest, Sha256};
use tempfile::{tempdir, TempDir};

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn numbered_lines(n: usize) -> String {
    (1..=n).map(|i| format!("line {i}\n")).collect()
}

/// A repository with `main.py` (10 lines), `README.md` (5 lines) and a `.git` directory.
fn sample_repo() -> TempDir {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join(".git/config"), "[core]\n");
    write_file(&dir.path().join(".git/HEAD"), "ref: refs/heads/main\n");
    write_file(&dir.path().join("main.py"), &numbered_lines(10));
    write_file(&dir.path().join("README.md"), &numbered_lines(5));
    dir
}

fn run(root: &Path, output: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codecontexter"))
        .arg(root)
        .arg("--output")
        .arg(output)
        .arg("--no-progress")
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn report(root: &Path, extra: &[&str]) -> String {
    let out_dir = tempdir().unwrap();
    let out_path = out_dir.path().join("summary.md");
    let output = run(root, &out_path, extra);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    fs::read_to_string(out_path).unwrap()
}

fn listed(report: &str, path: &str) -> bool {
    report.contains(&format!("### File: `{path}`"))
}

/// Original contents of `path`, recovered from its fenced block.
fn fenced_body(report: &str, path: &str) -> String {
    let heading = format!("### File: `{path}`");
    let section = &report[report.find(&heading).unwrap()..];
    let mut lines = section.lines().skip_while(|l| !l.starts_with("```"));
    let opener = lines.next().unwrap();
    let fence: String = opener.chars().take_while(|c| *c == '`').collect();
    let body: Vec<&str> = lines.by_ref().take_while(|l| *l != fence).collect();
    let mut contents: String = body.iter().map(|l| format!("{l}\n")).collect();
    if lines.find(|l| !l.is_empty()) == Some("_No newline at end of file._") {
        contents.pop();
    }
    contents
}

#[test]
fn cli_basic_report() {
    let dir = sample_repo();
    let out_dir = tempdir().unwrap();
    let out_path = out_dir.path().join("summary.md");

    let output = run(dir.path(), &out_path, &[]);
    assert!(output.status.success());

    let report = fs::read_to_string(&out_path).unwrap();
    let name = dir.path().file_name().unwrap().to_string_lossy();
    assert!(report.starts_with(&format!("# 📦 Code Summary: {name}\n")));
    assert!(report.contains("- **Total Files:** 2\n"));
    assert!(report.contains("- **Total Lines of Code:** 15\n"));
    assert!(report.contains("## 📋 File Metadata"));
    assert!(report.contains("| `main.py` |"));
    assert!(report.contains("| python | 1 | 10 |"));
    assert!(report.contains("| markdown | 1 | 5 |"));
    assert!(listed(&report, "main.py"));
    assert!(listed(&report, "README.md"));
    assert!(!report.contains(".git/"));
    assert!(!report.contains("Hash (SHA-256)"));

    let readme = report.find("### File: `README.md`").unwrap();
    let main = report.find("### File: `main.py`").unwrap();
    assert!(readme < main);

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Files processed: 2"));
    assert!(stdout.contains("Total lines: 15"));
}

#[test]
fn cli_include_hash() {
    let dir = sample_repo();
    let report = report(dir.path(), &["--include-hash"]);

    let bytes = fs::read(dir.path().join("main.py")).unwrap();
    let expected = format!("{:x}", Sha256::digest(&bytes));
    assert!(report.contains(&format!("**Hash (SHA-256):** `{expected}`")));
    assert_eq!(report.matches("**Hash (SHA-256):**").count(), 2);
}

#[test]
fn cli_no_metadata_table() {
    let dir = sample_repo();
    let report = report(dir.path(), &["--no-metadata-table"]);

    assert!(!report.contains("File Metadata"));
    assert!(!report.contains("| File | Size | Lines |"));
    assert!(report.contains("## 📑 Table of Contents"));
    assert!(listed(&report, "main.py"));
}

#[test]
fn cli_nested_gitignore() {
    let dir = sample_repo();
    write_file(&dir.path().join("top.log"), "kept\n");
    write_file(&dir.path().join("sub/.gitignore"), "*.log\n!keep.log\n");
    write_file(&dir.path().join("sub/debug.log"), "dropped\n");
    write_file(&dir.path().join("sub/keep.log"), "kept\n");
    write_file(&dir.path().join("sub/code.py"), "x = 1\n");
    write_file(&dir.path().join(".gitignore"), "*.tmp\nsecret/\n");
    write_file(&dir.path().join("scratch.tmp"), "dropped\n");
    write_file(&dir.path().join("sub/secret/key.txt"), "dropped\n");

    let report = report(dir.path(), &[]);
    assert!(listed(&report, "top.log"));
    assert!(listed(&report, "sub/keep.log"));
    assert!(listed(&report, "sub/code.py"));
    assert!(!report.contains("sub/debug.log"));
    assert!(!report.contains("scratch.tmp"));
    assert!(!report.contains("key.txt"));
}

#[test]
fn cli_permanent_patterns_cannot_be_negated() {
    let dir = sample_repo();
    write_file(&dir.path().join(".gitignore"), "!node_modules/\n");
    write_file(&dir.path().join("node_modules/pkg/index.js"), "module.exports = 1;\n");
    write_file(&dir.path().join("app/__pycache__/m.pyc"), "\0\0");

    let report = report(dir.path(), &[]);
    assert!(!report.contains("node_modules/pkg"));
    assert!(!report.contains("m.pyc"));
}

#[test]
fn cli_statistics_sum_to_totals() {
    let dir = sample_repo();
    write_file(&dir.path().join("Dockerfile"), "FROM alpine\n");
    write_file(&dir.path().join("tests/test_main.py"), "def test():\n    pass\n");
    write_file(&dir.path().join("config.yaml"), "a: 1\n");

    let report = report(dir.path(), &[]);
    assert!(report.contains("- **Total Files:** 5\n"));

    let section = |heading: &str| -> usize {
        let start = report.find(heading).unwrap();
        report[start..]
            .lines()
            .skip(4)
            .take_while(|l| l.starts_with('|'))
            .map(|l| l.split('|').nth(2).unwrap().trim().parse::<usize>().unwrap())
            .sum()
    };
    assert_eq!(section("### By Category"), 5);
    assert_eq!(section("### By Language"), 5);
}

#[test]
fn cli_content_round_trips_through_fence() {
    let dir = sample_repo();
    let doc = "# Usage\n\n```sh\nrun it\n```\n\n````text\nnested\n````\n";
    write_file(&dir.path().join("docs/usage.md"), doc);
    write_file(&dir.path().join("no_newline.py"), "print(1)");

    let report = report(dir.path(), &[]);
    assert!(report.contains("`````markdown\n"));
    assert_eq!(fenced_body(&report, "docs/usage.md"), doc);
    assert_eq!(fenced_body(&report, "no_newline.py"), "print(1)");
    assert_eq!(fenced_body(&report, "main.py"), numbered_lines(10));
}

#[test]
fn cli_binary_file_listed_without_contents() {
    let dir = sample_repo();
    fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G', 0, 0, 0, 1]).unwrap();

    let report = report(dir.path(), &[]);
    assert!(listed(&report, "logo.png"));
    assert!(report.contains("_Binary file: contents omitted._"));
}

#[test]
fn cli_output_is_idempotent() {
    let dir = sample_repo();
    write_file(&dir.path().join("src/lib.rs"), "pub fn f() {}\n");

    let strip = |s: String| -> String {
        s.lines()
            .filter(|l| !l.starts_with("**Generated:**"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let first = strip(report(dir.path(), &["--include-hash"]));
    let second = strip(report(dir.path(), &["--include-hash", "--jobs", "3"]));
    assert_eq!(first, second);
}

#[test]
fn cli_output_inside_scanned_tree_is_not_listed() {
    let dir = sample_repo();
    let out_path: PathBuf = dir.path().join("code_summary.md");

    let output = run(dir.path(), &out_path, &[]);
    assert!(output.status.success());
    let output = run(dir.path(), &out_path, &[]);
    assert!(output.status.success());

    let report = fs::read_to_string(&out_path).unwrap();
    assert!(!report.contains("code_summary.md"));
    assert!(report.contains("- **Total Files:** 2\n"));
}

#[test]
fn cli_default_output_path() {
    let dir = sample_repo();
    let cwd = tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_codecontexter"))
        .arg(dir.path())
        .current_dir(cwd.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(cwd.path().join("code_summary.md").is_file());
}

#[test]
fn cli_config_extends_tables() {
    let dir = sample_repo();
    write_file(&dir.path().join("build.zig"), "const std = @import(\"std\");\n");
    write_file(&dir.path().join("notes.draft"), "todo\n");
    let cfg_dir = tempdir().unwrap();
    let cfg = cfg_dir.path().join("extra.toml");
    write_file(
        &cfg,
        "[ignore]\nalways = [\"*.draft\"]\n\n[filetypes]\n\".zig\" = { language = \"zig\", category = \"source\" }\n",
    );

    let report = report(dir.path(), &["--config", cfg.to_str().unwrap()]);
    assert!(report.contains("**Language:** zig"));
    assert!(!report.contains("notes.draft"));
}

#[test]
fn cli_invalid_config_fails() {
    let dir = sample_repo();
    let cfg_dir = tempdir().unwrap();
    let cfg = cfg_dir.path().join("broken.toml");
    write_file(&cfg, "[filetypes\n");
    let out_path = cfg_dir.path().join("summary.md");

    let output = run(dir.path(), &out_path, &["--config", cfg.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out_path.exists());
}

#[test]
fn cli_missing_directory() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("summary.md");

    let output = run(&dir.path().join("does-not-exist"), &out_path, &[]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error: path not found"));
    assert!(!out_path.exists());
}

#[test]
fn cli_file_instead_of_directory() {
    let dir = sample_repo();
    let out_path = dir.path().join("summary.md");

    let output = run(&dir.path().join("main.py"), &out_path, &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(!out_path.exists());
}

#[test]
fn cli_requires_directory() {
    let output = Command::new(env!("CARGO_BIN_EXE_codecontexter"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_completions() {
    let output = Command::new(env!("CARGO_BIN_EXE_codecontexter"))
        .args(["--completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("codecontexter"));
}

#[test]
fn cli_scans_subdirectory_with_project_ignores() {
    let dir = sample_repo();
    write_file(&dir.path().join(".gitignore"), "generated/\n");
    write_file(&dir.path().join(".git/info/exclude"), "local.py\n");
    write_file(&dir.path().join("pkg/mod.py"), "x = 1\n");
    write_file(&dir.path().join("pkg/local.py"), "x = 2\n");
    write_file(&dir.path().join("pkg/generated/out.py"), "x = 3\n");

    let report = report(&dir.path().join("pkg"), &[]);
    assert!(listed(&report, "mod.py"));
    assert!(!report.contains("local.py"));
    assert!(!report.contains("out.py"));
}

#[cfg(unix)]
#[test]
fn cli_skipped_entries_are_quiet_without_verbose() {
    let dir = sample_repo();
    std::os::unix::fs::symlink(dir.path().join("missing.py"), dir.path().join("dangling.py"))
        .unwrap();
    let out_dir = tempdir().unwrap();
    let out_path = out_dir.path().join("summary.md");

    let quiet = run(dir.path(), &out_path, &[]);
    assert!(quiet.status.success());
    let stderr = String::from_utf8(quiet.stderr).unwrap();
    assert!(!stderr.contains("broken symlink"), "stderr: {stderr}");

    let verbose = run(dir.path(), &out_path, &["--verbose"]);
    assert!(verbose.status.success());
    let stderr = String::from_utf8(verbose.stderr).unwrap();
    assert!(stderr.contains("broken symlink"), "stderr: {stderr}");
    assert!(!stderr.contains('\u{1b}'), "stderr: {stderr}");

    let report = fs::read_to_string(&out_path).unwrap();
    assert!(!listed(&report, "dangling.py"));
    assert!(listed(&report, "main.py"));
}
