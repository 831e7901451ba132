//! Tests for the pre-commit hook.

use crate::support::*;

fn stage(t: &Test, path: &str) {
    let full = t.root().join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(&full, "staged\n").unwrap();
    assert!(t.git(&["add", "--force", path]));
}

#[test]
fn test_install_writes_executable_hook() {
    let t = Test::new();

    let output = t.cmd().args(["hook", "install"]).output().unwrap();

    assert_success(&output);
    let hook = t.root().join(".git/hooks/pre-commit");
    let body = std::fs::read_to_string(&hook).unwrap();
    assert!(body.contains("exec catapult hook pre-commit"));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&hook).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_develop_requires_a_ciphertext() {
    let t = Test::new();
    if !t.git_init("develop") {
        eprintln!("SKIPPED: git not available");
        return;
    }
    stage(&t, "notes.txt");

    let output = t.pre_commit();

    assert_failure(&output);
    assert_stderr_contains(&output, "only meant for configuration ciphertexts");
}

#[test]
fn test_develop_accepts_a_ciphertext() {
    let t = Test::new();
    if !t.git_init("develop") {
        eprintln!("SKIPPED: git not available");
        return;
    }
    stage(&t, "secrets/configuration.toml.age");

    assert_success(&t.pre_commit());
}

#[test]
fn test_contribution_branch_rejects_secrets() {
    let t = Test::new();
    if !t.git_init("develop-catapult") {
        eprintln!("SKIPPED: git not available");
        return;
    }
    stage(&t, "VERSION.toml");
    stage(&t, "secrets/id_rsa.age");

    let output = t.pre_commit();

    assert_failure(&output);
    assert_stderr_contains(&output, "secrets/id_rsa.age");
}

#[test]
fn test_contribution_branch_requires_version_bump() {
    let t = Test::new();
    if !t.git_init("develop-catapult") {
        eprintln!("SKIPPED: git not available");
        return;
    }
    stage(&t, "src/lib.rs");

    let output = t.pre_commit();

    assert_failure(&output);
    assert_stderr_contains(&output, "VERSION.toml");
}

#[test]
fn test_master_rejects_direct_commits() {
    let t = Test::new();
    if !t.git_init("master") {
        eprintln!("SKIPPED: git not available");
        return;
    }
    stage(&t, "README.md");

    let output = t.pre_commit();

    assert_failure(&output);
    assert_stderr_contains(&output, "open a pull request");
}
