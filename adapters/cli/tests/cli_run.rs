use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_auto-battle"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch auto-battle")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn demo_battle_prints_summary() {
    let output = run(&["--seconds", "60", "--draw"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("Auto-battle combat core."));
    assert!(text.contains("outcome: "));
    assert!(text.contains("buildings remaining: "));
}

#[test]
fn exported_layout_can_be_replayed() {
    let exported = run(&["--export-layout"]);
    assert!(exported.status.success());
    let layout = stdout(&exported).trim().to_owned();
    assert!(layout.starts_with("battle:v1:16x12:"));

    let replay = run(&["--layout", &layout, "--seconds", "0"]);

    assert!(replay.status.success());
    let text = stdout(&replay);
    assert!(text.contains("outcome: undecided"));
    assert!(text.contains("attackers remaining: 5"));
    assert!(text.contains("buildings remaining: 8"));
}

#[test]
fn obstacle_scatter_is_reproducible() {
    let first = run(&["--obstacles", "12", "--seed", "9", "--seconds", "0", "--draw"]);
    let second = run(&["--obstacles", "12", "--seed", "9", "--seconds", "0", "--draw"]);

    assert!(first.status.success());
    assert_eq!(stdout(&first), stdout(&second));
    let blocked = stdout(&first).matches('#').count();
    assert_eq!(blocked, 24, "twelve obstacles drawn on both maps");
}

#[test]
fn malformed_layout_fails() {
    let output = run(&["--layout", "maze:v1:4x4:e30"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid --layout string"));
}
