//! Branch gating, sync and the run lock.

use catapult::core::lifecycle::Persisted;
use catapult::core::lock;
use catapult::error::{Error, LockError, VcsError};

use crate::support::*;

fn lock_files(t: &Test) -> Vec<String> {
    std::fs::read_dir(t.root())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| lock::is_marker(n))
        .collect()
}

#[test]
fn test_release_and_master_never_write() {
    for branch in ["release", "master"] {
        let t = Test::seeded(CONFIGURATION);
        let before = t.ciphertext();
        let connector =
            FakeConnector::empty().with_droplets(vec![droplet("acme-test-redhat", "2.2.2.2")]);

        let report = t.run(&FakeVcs::on(branch), &connector).unwrap();

        assert_eq!(report.persisted, Some(Persisted::Skipped), "{}", branch);
        assert_eq!(t.ciphertext(), before, "{}", branch);
        assert!(!t.layout().changes_marker().exists(), "{}", branch);
    }
}

#[test]
fn test_contribution_branch_restores_secrets_from_develop() {
    let t = Test::seeded(CONFIGURATION);
    // keypair ciphertexts come from develop on this branch
    t.run(&FakeVcs::on("develop"), &FakeConnector::empty()).unwrap();
    let vcs = FakeVcs::on("develop-catapult");

    let report = t.run(&vcs, &FakeConnector::empty()).unwrap();

    let calls = vcs.calls();
    for blob in ["configuration.toml.age", "id_rsa.age", "id_rsa.pub.age"] {
        assert!(calls.contains(&format!("checkout develop -- secrets/{}", blob)));
        assert!(calls.contains(&format!("reset secrets/{}", blob)));
    }
    assert_eq!(report.persisted, None);
}

#[test]
fn test_unknown_branch_is_fatal() {
    let t = Test::seeded(CONFIGURATION);

    let err = t
        .run(&FakeVcs::on("feature/redesign"), &FakeConnector::empty())
        .unwrap_err();

    assert!(matches!(err, Error::Vcs(VcsError::UnsupportedBranch(ref b)) if b == "feature/redesign"));
    assert!(err.hint().is_some());
    assert!(lock_files(&t).is_empty());
}

#[test]
fn test_develop_syncs_with_origin() {
    let t = Test::seeded(CONFIGURATION);
    let mut vcs = FakeVcs::on("develop");
    vcs.remote_ahead = true;

    t.run(&vcs, &FakeConnector::empty()).unwrap();

    let calls = vcs.calls();
    assert_eq!(
        &calls[..4],
        &[
            "fetch origin".to_string(),
            "diff HEAD origin/develop".to_string(),
            "pull origin develop".to_string(),
            "push origin develop".to_string(),
        ]
    );
    assert!(t.layout().changes_marker().exists());
}

#[test]
fn test_release_does_not_propagate() {
    let t = Test::seeded(CONFIGURATION);
    let vcs = FakeVcs::on("release");

    t.run(&vcs, &FakeConnector::empty()).unwrap();

    assert!(vcs.calls().is_empty());
}

#[test]
fn test_lock_is_released_after_run() {
    let t = Test::seeded(CONFIGURATION);

    t.run(&FakeVcs::on("develop"), &FakeConnector::empty()).unwrap();

    assert!(lock_files(&t).is_empty());
}

#[test]
fn test_held_lock_blocks_run() {
    let t = Test::seeded(CONFIGURATION);
    std::fs::write(t.root().join("00000000a1b2c3d4.lock"), "").unwrap();

    let err = t
        .run(&FakeVcs::on("develop"), &FakeConnector::empty())
        .unwrap_err();

    assert!(matches!(err, Error::Lock(LockError::Contention { .. })));
    assert_eq!(lock_files(&t), vec!["00000000a1b2c3d4.lock"]);
}

#[test]
fn test_wrong_passphrase_is_fatal() {
    let t = Test::seeded(CONFIGURATION);
    std::fs::write(
        t.layout().settings(),
        "[settings]\npassphrase = \"an-entirely-different-passphrase\"\n",
    )
    .unwrap();

    let err = t
        .run(&FakeVcs::on("release"), &FakeConnector::empty())
        .unwrap_err();

    assert!(err.hint().unwrap().contains("passphrase"));
    assert!(lock_files(&t).is_empty());
}

#[test]
fn test_other_lock_files_do_not_block() {
    let t = Test::seeded(CONFIGURATION);
    std::fs::write(t.root().join("Gemfile.lock"), "").unwrap();

    t.run(&FakeVcs::on("develop"), &FakeConnector::empty()).unwrap();

    assert!(t.root().join("Gemfile.lock").exists());
    assert!(lock_files(&t).is_empty());
}

#[test]
fn test_push_happens_last() {
    let t = Test::seeded(CONFIGURATION);
    let vcs = FakeVcs::on("develop");

    t.run(&vcs, &FakeConnector::empty()).unwrap();

    assert_eq!(vcs.calls().last().map(String::as_str), Some("push origin develop"));
}
