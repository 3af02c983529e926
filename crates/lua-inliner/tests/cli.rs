//! Integration tests for the lua-inliner CLI.
//!
//! These tests spawn the compiled binary in a scratch directory and assert on
//! stdout/stderr, exit codes and written files.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const ADD: &str = "local function f(a, b)\n    --!!INLINE_FUNCTION\n    return a + b\nend\nlocal x = f(1, 2)\n";

const ADD_INLINED: &str = "local function f(a, b)\n    --!!INLINE_FUNCTION\n    return a + b\nend\nlocal __inline_return__0 = nil\nrepeat\n    local a, b = 1, 2\n    __inline_return__0 = a + b\n    break\nuntil true\nlocal x = __inline_return__0\n";

const RECURSIVE: &str = "local function f(n)\n    --!!INLINE_FUNCTION\n    return f(n)\nend\nlocal r = f(1)\n";

fn lua_inliner(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lua-inliner"));
    cmd.current_dir(dir).arg("--no-color");
    cmd
}

fn scratch(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = temp.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    temp
}

#[test]
fn legacy_invocation_prints_the_rewritten_file() {
    let temp = scratch(&[("main.lua", ADD)]);
    lua_inliner(temp.path())
        .arg("main.lua")
        .assert()
        .success()
        .stdout(ADD_INLINED);
}

#[test]
fn output_file_is_written() {
    let temp = scratch(&[("main.lua", ADD)]);
    lua_inliner(temp.path())
        .args(["inline", "main.lua", "-o", "out/main.lua"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inlined 1 call site(s), wrote 1 of 1 file(s)"));

    let written = fs::read_to_string(temp.path().join("out/main.lua")).unwrap();
    assert_eq!(written, ADD_INLINED);
}

#[test]
fn directory_requires_an_output_option() {
    let temp = scratch(&[("src/main.lua", ADD)]);
    lua_inliner(temp.path())
        .args(["inline", "src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is a directory"));
}

#[test]
fn directory_is_mirrored_into_output() {
    let temp = scratch(&[
        ("src/main.lua", ADD),
        ("src/lib/util.lua", "return { answer = 42 }\n"),
    ]);
    lua_inliner(temp.path())
        .args(["inline", "src", "--output", "build"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(temp.path().join("build/main.lua")).unwrap(),
        ADD_INLINED
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("build/lib/util.lua")).unwrap(),
        "return { answer = 42 }\n"
    );
}

#[test]
fn in_place_rewrites_the_input() {
    let temp = scratch(&[("main.lua", ADD)]);
    lua_inliner(temp.path())
        .args(["inline", "main.lua", "--in-place"])
        .assert()
        .success();

    let written = fs::read_to_string(temp.path().join("main.lua")).unwrap();
    assert_eq!(written, ADD_INLINED);
}

#[test]
fn diff_shows_changes_without_writing() {
    let temp = scratch(&[("main.lua", ADD)]);
    lua_inliner(temp.path())
        .args(["inline", "main.lua", "--diff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- a/main.lua"))
        .stdout(predicate::str::contains("-local x = f(1, 2)"))
        .stdout(predicate::str::contains("+local x = __inline_return__0"));

    let unchanged = fs::read_to_string(temp.path().join("main.lua")).unwrap();
    assert_eq!(unchanged, ADD);
}

#[test]
fn recursive_inline_function_fails() {
    let temp = scratch(&[("rec.lua", RECURSIVE)]);
    lua_inliner(temp.path())
        .args(["inline", "rec.lua"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error[INL003]"))
        .stderr(predicate::str::contains("rec.lua:3:12"))
        .stderr(predicate::str::contains("1 file(s) could not be inlined"));
}

#[test]
fn redirected_diagnostics_are_plain_text() {
    let temp = scratch(&[("rec.lua", RECURSIVE)]);
    Command::new(assert_cmd::cargo::cargo_bin!("lua-inliner"))
        .current_dir(temp.path())
        .args(["inline", "rec.lua"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[INL003]"))
        .stderr(predicate::str::contains("\x1b[").not());
}

#[test]
fn shadowed_capture_is_left_as_a_call() {
    let source = "local n = 0\nlocal function bump()\n    --!!INLINE_FUNCTION\n    n = n + 1\nend\ndo\n    local n = 10\n    bump()\n    print(n)\nend\n";
    let temp = scratch(&[("bump.lua", source)]);
    lua_inliner(temp.path())
        .args(["inline", "bump.lua"])
        .assert()
        .success()
        .stdout(source)
        .stderr(predicate::str::contains("warning[INL006]"));
}

#[test]
fn config_file_can_downgrade_a_diagnostic() {
    let temp = scratch(&[
        ("rec.lua", RECURSIVE),
        (
            "lua-inliner.toml",
            "[inline.severity]\nrecursive-call = \"warning\"\n\n[output]\nindent = 2\n",
        ),
    ]);
    lua_inliner(temp.path())
        .args(["inline", "rec.lua"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local r = __inline_return__0"))
        .stdout(predicate::str::contains("\n  local n = 1\n"))
        .stderr(predicate::str::contains("warning[INL003]"));
}

#[test]
fn error_on_flag_raises_the_threshold() {
    let temp = scratch(&[(
        "cond.lua",
        "local function f(a, b)\n    --!!INLINE_FUNCTION\n    return a + b\nend\nlocal x = ok and f(1, 2)\n",
    )]);
    lua_inliner(temp.path())
        .args(["inline", "cond.lua"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning[INL004]"));

    lua_inliner(temp.path())
        .args(["inline", "cond.lua", "--error-on", "warning"])
        .assert()
        .failure();
}

#[test]
fn check_reports_counts_as_json() {
    let temp = scratch(&[("main.lua", ADD)]);
    lua_inliner(temp.path())
        .args(["--format", "json", "check", "main.lua"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"call_sites\":1"))
        .stdout(predicate::str::contains("\"inlined\":1"))
        .stdout(predicate::str::contains("\"type\":\"summary\""));

    // Nothing is written by check.
    assert_eq!(fs::read_to_string(temp.path().join("main.lua")).unwrap(), ADD);
}

#[test]
fn check_fails_on_invalid_files() {
    let temp = scratch(&[("good.lua", ADD), ("bad.lua", RECURSIVE)]);
    lua_inliner(temp.path())
        .args(["check", ".", "--short"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ok ./good.lua"))
        .stdout(predicate::str::contains("failed ./bad.lua"))
        .stdout(predicate::str::contains(
            "./bad.lua:3:12: error: cannot inline recursive call to 'f' [INL003]",
        ));
}

#[test]
fn explain_known_and_unknown_codes() {
    let temp = TempDir::new().unwrap();
    lua_inliner(temp.path())
        .args(["explain", "inl003"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INL003: Recursive Inline Call"));

    lua_inliner(temp.path())
        .args(["--format", "json", "explain", "conditional-call"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"severity\": \"warning\""));

    lua_inliner(temp.path())
        .args(["explain", "X999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown diagnostic code: X999"));
}

#[test]
fn shows_version() {
    let temp = TempDir::new().unwrap();
    lua_inliner(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
