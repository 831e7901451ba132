//! Discovery merge, credential generation and idempotence.

use catapult::core::domain::{EnvName, ServerRole};
use catapult::core::lifecycle::Persisted;
use catapult::core::provider::ProviderKind;
use catapult::error::{Error, ProviderError};

use crate::support::*;

#[test]
fn test_running_droplet_overwrites_stale_ip() {
    let t = Test::seeded(CONFIGURATION);
    let connector =
        FakeConnector::empty().with_droplets(vec![droplet("acme-test-redhat", "2.2.2.2")]);

    let report = t.run(&FakeVcs::on("develop"), &connector).unwrap();

    assert_eq!(report.persisted, Some(Persisted::Written));
    let committed = t.committed();
    let redhat = server(&committed, EnvName::Test, ServerRole::Redhat);
    assert_eq!(redhat.ip.as_deref(), Some("2.2.2.2"));
    assert_eq!(redhat.ip_private.as_deref(), Some("10.132.0.2"));
    assert_eq!(redhat.id.as_deref(), Some("3164444"));
    // production droplet was not reported
    assert_eq!(
        server(&committed, EnvName::Production, ServerRole::Redhat).ip.as_deref(),
        Some("3.3.3.3")
    );
    assert!(t.layout().changes_marker().exists());
}

#[test]
fn test_second_run_is_a_no_op() {
    let t = Test::seeded(CONFIGURATION);
    let connector =
        FakeConnector::empty().with_droplets(vec![droplet("acme-test-redhat", "2.2.2.2")]);
    let vcs = FakeVcs::on("develop");

    t.run(&vcs, &connector).unwrap();
    let first = t.ciphertext();
    let report = t.run(&vcs, &connector).unwrap();

    assert_eq!(report.persisted, None);
    assert_eq!(t.ciphertext(), first);
}

#[test]
fn test_unavailable_provider_keeps_last_known_values() {
    let t = Test::seeded(CONFIGURATION);
    let vcs = FakeVcs::on("develop");
    t.run(&vcs, &FakeConnector::empty()).unwrap();
    let before = t.ciphertext();

    let mut connector = FakeConnector::empty();
    connector.redhat = FakeProvider::unavailable(ProviderKind::DigitalOcean)
        .with_sizes(DROPLET_SIZES);
    let report = t.run(&vcs, &connector).unwrap();

    assert_eq!(report.persisted, None);
    assert_eq!(t.ciphertext(), before);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("provisioning, deployments, and dashboard reporting")));
    assert_eq!(
        server(&t.committed(), EnvName::Test, ServerRole::Redhat).ip.as_deref(),
        Some("1.1.1.1")
    );
}

#[test]
fn test_stopped_droplet_is_ignored() {
    let t = Test::seeded(CONFIGURATION);
    let mut stopped = droplet("acme-test-redhat", "2.2.2.2");
    stopped.status = "off".to_string();
    stopped.running = false;

    t.run(
        &FakeVcs::on("develop"),
        &FakeConnector::empty().with_droplets(vec![stopped]),
    )
    .unwrap();

    assert_eq!(
        server(&t.committed(), EnvName::Test, ServerRole::Redhat).ip.as_deref(),
        Some("1.1.1.1")
    );
}

#[test]
fn test_credentials_are_generated_once() {
    let t = Test::seeded(CONFIGURATION);
    let vcs = FakeVcs::on("develop");

    t.run(&vcs, &FakeConnector::empty()).unwrap();
    let first = t.committed();
    t.run(&vcs, &FakeConnector::empty()).unwrap();
    let second = t.committed();

    let dev_mysql = server(&first, EnvName::Dev, ServerRole::RedhatMysql).mysql.unwrap();
    assert_eq!(dev_mysql.user_password.as_deref(), Some("password"));
    assert_eq!(dev_mysql.root_password.as_deref(), Some("password"));

    let test_mssql = server(&first, EnvName::Test, ServerRole::WindowsMssql).mssql.unwrap();
    assert_eq!(test_mssql.user.as_deref(), Some("test"));
    assert_eq!(test_mssql.sa_password.as_ref().map(|p| p.len()), Some(22));

    assert_eq!(first, second);
    assert!(first.environments.qc.is_none());
}

#[test]
fn test_kernel_is_remediated() {
    let t = Test::seeded(CONFIGURATION);
    let mut wrong_kernel = droplet("acme-production-redhat", "3.3.3.3");
    wrong_kernel.kernel = Some(6199);
    let connector = FakeConnector::empty().with_droplets(vec![wrong_kernel]);

    let report = t.run(&FakeVcs::on("develop"), &connector).unwrap();

    assert!(connector
        .redhat
        .calls()
        .contains(&"change_kernel 3164444 7516".to_string()));
    assert_eq!(report.remediations.len(), 1);
}

#[test]
fn test_each_provider_is_listed_once() {
    let t = Test::seeded(CONFIGURATION);
    let connector = FakeConnector::empty();

    t.run(&FakeVcs::on("develop"), &connector).unwrap();

    assert_eq!(connector.redhat.calls(), vec!["list"]);
    assert_eq!(connector.windows.calls(), vec!["list"]);
    assert_eq!(connector.local.calls(), vec!["list"]);
}

#[test]
fn test_missing_droplet_size_lists_catalog() {
    let config = CONFIGURATION.replace("slug = \"s-2vcpu-2gb\"", "slug = \"\"");
    let t = Test::seeded(&config);

    let err = t
        .run(&FakeVcs::on("develop"), &FakeConnector::empty())
        .unwrap_err();

    assert_error_mentions(&err, "environments.production.servers.redhat_mysql.slug");
    assert_error_mentions(&err, "s-1vcpu-1gb, s-2vcpu-2gb");
}

#[test]
fn test_generated_records_pass_the_next_run() {
    let config = CONFIGURATION
        .replace(
            "[environments.test.servers.redhat_mysql]\nslug = \"s-1vcpu-1gb\"\n",
            "",
        )
        .replace(
            "[environments.production.servers.redhat_mysql]\nslug = \"s-2vcpu-2gb\"\n",
            "",
        );
    assert!(!config.contains("redhat_mysql"));
    let t = Test::seeded(&config);
    let vcs = FakeVcs::on("develop");

    let first = t.run(&vcs, &FakeConnector::empty()).unwrap();
    let second = t.run(&vcs, &FakeConnector::empty()).unwrap();

    assert_eq!(first.persisted, Some(Persisted::Written));
    assert_eq!(second.persisted, None);
    let mysql = server(&t.committed(), EnvName::Test, ServerRole::RedhatMysql);
    assert!(mysql.slug.is_none());
    assert!(mysql.mysql.is_some());
}

#[test]
fn test_rejected_credentials_are_fatal() {
    let t = Test::seeded(CONFIGURATION);
    let before = t.ciphertext();
    let mut connector = FakeConnector::empty();
    connector.redhat =
        FakeProvider::rejecting(ProviderKind::DigitalOcean, 401).with_sizes(DROPLET_SIZES);
    let vcs = FakeVcs::on("develop");

    let err = t.run(&vcs, &connector).unwrap_err();

    assert!(matches!(
        err,
        Error::Provider(ProviderError::Auth { provider: "digitalocean", status: 401 })
    ));
    assert!(err.hint().unwrap().contains("digitalocean"));
    assert_eq!(t.ciphertext(), before);
    assert!(!vcs.calls().contains(&"push origin develop".to_string()));
}

#[test]
fn test_failed_kernel_change_is_not_fatal() {
    let t = Test::seeded(CONFIGURATION);
    let mut wrong_kernel = droplet("acme-production-redhat", "3.3.3.3");
    wrong_kernel.kernel = Some(6199);
    let mut connector = FakeConnector::empty().with_droplets(vec![wrong_kernel]);
    connector.redhat.kernel_fails = true;

    let report = t.run(&FakeVcs::on("develop"), &connector).unwrap();

    assert_eq!(report.remediations.len(), 1);
    let remediation = &report.remediations[0];
    assert_eq!(remediation.instance, "acme-production-redhat");
    assert!(remediation.failure.as_deref().unwrap().contains("HTTP 422"));
    assert_eq!(report.persisted, Some(Persisted::Written));
}

#[test]
fn test_running_ec2_instance_sets_type() {
    let t = Test::seeded(CONFIGURATION);
    let connector = FakeConnector::empty().with_instances(vec![
        ec2_instance("acme-test-windows", "4.4.4.4", "t3.medium"),
        ec2_instance("acme-dev-windows", "5.5.5.5", "t3.large"),
    ]);

    t.run(&FakeVcs::on("develop"), &connector).unwrap();

    let committed = t.committed();
    let windows = server(&committed, EnvName::Test, ServerRole::Windows);
    assert_eq!(windows.ip.as_deref(), Some("4.4.4.4"));
    assert_eq!(windows.ip_private.as_deref(), Some("172.31.0.10"));
    assert_eq!(windows.instance_type.as_deref(), Some("t3.medium"));
    assert_eq!(windows.id.as_deref(), Some("i-0abc1234"));
    assert!(windows.slug.is_none());
    // dev is served by local virtualization
    assert!(server(&committed, EnvName::Dev, ServerRole::Windows).ip.is_none());
}
