//! Validation runs before any provider is consulted.

use catapult::core::repository::{Probe, RepoFacts};
use catapult::core::validation::Rule;
use catapult::error::Error;

use crate::support::*;

fn rejected(config: &str) -> (catapult::error::ValidationError, FakeConnector) {
    let t = Test::seeded(config);
    let connector = FakeConnector::empty();

    let err = t.run(&FakeVcs::on("develop"), &connector).unwrap_err();

    match err {
        Error::Validation(e) => (e, connector),
        other => panic!("expected a validation error, got: {}", other),
    }
}

#[test]
fn test_domains_must_be_alphabetical() {
    let config = CONFIGURATION
        .replace("alpha.example.com", "zulu.example.com")
        .replace("git@github.com:acme/alpha.git", "git@github.com:acme/zulu.git");

    let (err, connector) = rejected(&config);

    assert_eq!(err.rule, Rule::Order);
    assert_eq!(err.field, "websites.apache");
    assert!(connector.redhat.calls().is_empty());
    assert!(connector.host.calls.lock().unwrap().is_empty());
}

#[test]
fn test_domain_with_protocol_is_rejected() {
    let config = CONFIGURATION.replace("\"alpha.example.com\"", "\"http://alpha.example.com\"");

    let (err, _) = rejected(&config);

    assert_eq!(err.rule, Rule::Protocol);
    assert_eq!(err.field, "websites.apache[http://alpha.example.com].domain");
}

#[test]
fn test_long_company_name_is_rejected() {
    let config = CONFIGURATION.replace("name = \"Acme\"", &format!("name = \"{}\"", "a".repeat(40)));

    let (err, connector) = rejected(&config);

    assert_eq!(err.rule, Rule::Length);
    assert_eq!(err.field, "company.name");
    assert!(connector.windows.calls().is_empty());
}

#[test]
fn test_false_force_https_is_rejected() {
    let config = CONFIGURATION.replace("force_https = true", "force_https = false");

    let (err, _) = rejected(&config);

    assert_eq!(err.rule, Rule::Format);
}

#[test]
fn test_missing_branch_is_rejected_before_discovery() {
    let t = Test::seeded(CONFIGURATION);
    let mut connector = FakeConnector::empty();
    connector.host.probe = Probe::Found(RepoFacts {
        exists: true,
        writable: true,
        empty: false,
        branches: vec!["master".to_string(), "develop".to_string()],
    });

    let err = t.run(&FakeVcs::on("develop"), &connector).unwrap_err();

    assert_error_mentions(&err, "does not have a release branch");
    assert!(connector.redhat.calls().is_empty());
}

#[test]
fn test_unreachable_code_host_is_a_warning() {
    let t = Test::seeded(CONFIGURATION);
    let mut connector = FakeConnector::empty();
    connector.host.probe = Probe::Unavailable("HTTP 502".to_string());

    let report = t.run(&FakeVcs::on("develop"), &connector).unwrap();

    assert!(report.warnings.iter().any(|w| w.contains("github.com")));
    assert!(report.warnings.iter().any(|w| w.contains("bitbucket.org")));
}

#[test]
fn test_unknown_environment_fails_to_parse() {
    let config = format!("{}\n[environments.staging.servers.redhat]\nip = \"1.2.3.4\"\n", CONFIGURATION);
    let t = Test::seeded(&config);

    let err = t
        .run(&FakeVcs::on("develop"), &FakeConnector::empty())
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
}
