//! End-to-end CLI tests (spec §3 "Test tooling"): invoke the real `botc`
//! binary against a temp directory and inspect what it writes.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn botc() -> Command {
    Command::cargo_bin("botc").unwrap()
}

#[test]
fn compiles_an_empty_spawn_state_to_an_object_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("main.bts");
    fs::write(&source, "state statespawn { }\n").unwrap();
    let output = dir.path().join("main.o");

    botc().current_dir(dir.path()).arg("main.bts").assert().success();

    let bytes = fs::read(&output).unwrap();
    assert!(!bytes.is_empty());
}

#[test]
fn derives_output_path_by_replacing_the_extension() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hello.bts"), "state statespawn { }\n").unwrap();

    botc().current_dir(dir.path()).arg("hello.bts").assert().success();

    assert!(dir.path().join("hello.o").exists());
}

#[test]
fn honors_an_explicit_output_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.bts"), "state statespawn { }\n").unwrap();

    botc().current_dir(dir.path()).args(["main.bts", "out.bin"]).assert().success();

    assert!(dir.path().join("out.bin").exists());
}

#[test]
fn missing_spawn_state_is_a_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.bts"), "state other { }\n").unwrap();

    botc()
        .current_dir(dir.path())
        .arg("main.bts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("statespawn"));
}

#[test]
fn missing_source_argument_without_listfunctions_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    botc().current_dir(dir.path()).assert().failure();
}

#[test]
fn listfunctions_reads_the_default_defs_file_and_exits_without_compiling() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("botc_defs.bts"),
        "builtindef int 7:log(str msg);\neventdef 0:onTick();\n",
    )
    .unwrap();

    botc()
        .current_dir(dir.path())
        .arg("--listfunctions")
        .assert()
        .success()
        .stdout(predicate::str::contains("log").and(predicate::str::contains("opcode 7")));
}
