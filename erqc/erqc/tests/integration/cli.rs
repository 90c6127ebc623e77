#![cfg(all(not(target_family = "wasm"), feature = "cli"))]

use insta_cmd::assert_cmd_snapshot;
use insta_cmd::get_cargo_bin;
use std::process::Command;

#[test]
fn sql() {
    assert_cmd_snapshot!(erqc_command()
        .args(["sql"])
        .pass_stdin("T[a > 1]{a};;\nif exists(T) then delete from T end"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    select a from T where (a > 1);
    select case when exists (select * from T) then 1 else 0 end;
    delete from T;

    ----- stderr -----
    ");
}

#[test]
fn compile() {
    assert_cmd_snapshot!(erqc_command()
        .args(["compile", "--rule", "statement"])
        .pass_stdin("T output raw to 'out.txt'"), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    [
      {
        "type": "select",
        "query": "select * from T",
        "format": "raw",
        "dest": {
          "type": "file",
          "path": "out.txt"
        }
      }
    ]

    ----- stderr -----
    "#);
}

#[test]
fn compile_error() {
    assert_cmd_snapshot!(erqc_command()
        .args(["compile"])
        .pass_stdin(r"T{e'\q'}"), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    Error:
       ╭─[ :1:3 ]
       │
     1 │ T{e'\q'}
       │   ──┬──
       │     ╰──── unsupported escape `\q`
       │
       │ Help: use `\\` for a literal backslash
    ───╯
    ");
}

#[test]
fn rule_from_env() {
    assert_cmd_snapshot!(erqc_command()
        .args(["sql"])
        .env("ERQC_RULE", "repl-line")
        .pass_stdin("T{a}"), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    Error: incomplete input
    ");
}

fn erqc_command() -> Command {
    let mut cmd = Command::new(get_cargo_bin("erqc"));
    normalize_erqc(&mut cmd);
    cmd
}

fn normalize_erqc(cmd: &mut Command) -> &mut Command {
    cmd
        // `CLICOLOR_FORCE` overrides `--color=never`, and snapshots shouldn't
        // carry colors.
        .env_remove("CLICOLOR_FORCE")
        .env("NO_COLOR", "1")
        .args(["--color=never"])
        // We don't want the tests to be affected by the user's `RUST_BACKTRACE` setting.
        .env_remove("RUST_BACKTRACE")
        .env_remove("RUST_LOG")
        .env_remove("ERQC_RULE")
        .env_remove("ERQC_DEBUG_LOG")
}
