use assert_cmd::Command;

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("octest").unwrap();
    cmd.arg("--help");
    let output = cmd.assert().success().get_output().stdout.clone();
    let help = String::from_utf8_lossy(&output);
    for subcommand in ["check", "get", "remove", "version", "query"] {
        assert!(help.contains(subcommand), "missing '{}' in:\n{}", subcommand, help);
    }
}

#[test]
fn check_requires_resource() {
    let mut cmd = Command::cargo_bin("octest").unwrap();
    cmd.args(&["check", "present"]);
    cmd.assert().failure();
}

#[test]
fn check_rejects_unknown_method() {
    let mut cmd = Command::cargo_bin("octest").unwrap();
    cmd.args(&["check", "exists", "--", "pods"]);
    cmd.assert().failure();
}

#[test]
fn missing_oc_binary_fails() {
    let mut cmd = Command::cargo_bin("octest").unwrap();
    cmd.args(&["--oc", "/nonexistent/oc", "version"]);
    cmd.assert().failure();
}
