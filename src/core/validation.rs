//! Validation of the declared configuration.
//!
//! Company checks fail fast because every later step spends its credentials.
//! Website checks run structurally over every service first, then ask the
//! code host about each repository. Nothing here mutates the model.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::constants;
use crate::core::domain::{Company, Configuration, EnvName, ProviderName, WebsiteInstance, Workflow};
use crate::core::repository::{Probe, RepoRef, RepositoryHost};
use crate::error::{ConfigError, Result, ValidationError};

/// The rule a declaration violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// A required value is absent or empty.
    Missing,
    /// A domain includes a URI scheme.
    Protocol,
    /// A value contains characters outside its allowed set.
    Charset,
    /// A domain has the wrong number of labels.
    Depth,
    /// A value is too long or too short.
    Length,
    /// A field requires another field that is not set.
    Dependency,
    /// A value is not one of the allowed choices.
    Membership,
    /// A value is malformed.
    Format,
    /// Websites of a service are not in alphabetical order.
    Order,
    /// A website repository is unusable.
    Repository,
}

/// Software available per service, from `provisioners/provisioners.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoftwareCatalog {
    #[serde(default)]
    software: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl SoftwareCatalog {
    /// Load the catalog if the file exists.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!(path = %path.display(), "no software catalog");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        Ok(Some(catalog))
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut software: BTreeMap<String, BTreeMap<String, toml::Value>> = BTreeMap::new();
        for (service, name) in entries {
            software
                .entry(service.to_string())
                .or_default()
                .insert(name.to_string(), toml::Value::Table(Default::default()));
        }
        Self { software }
    }

    pub fn names(&self, service: &str) -> Vec<&str> {
        self.software
            .get(service)
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn fail(field: impl Into<String>, rule: Rule, reason: impl Into<String>) -> Result<()> {
    Err(ValidationError::new(field, rule, reason).into())
}

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return fail(format!("company.{}", field), Rule::Missing, "must be set");
    }
    Ok(())
}

/// Validate company identity and credentials.
///
/// # Errors
///
/// Returns the first `ValidationError` found.
pub fn validate_company(company: &Company) -> Result<()> {
    required("name", &company.name)?;
    if company.name.chars().count() > constants::MAX_COMPANY_NAME {
        return fail(
            "company.name",
            Rule::Length,
            format!(
                "the maximum amount of characters is {}",
                constants::MAX_COMPANY_NAME
            ),
        );
    }
    required("email", &company.email)?;
    required("timezone_redhat", &company.timezone_redhat)?;
    required("timezone_windows", &company.timezone_windows)?;
    required("repo", &company.repo)?;

    for provider in ProviderName::ALL {
        for field in provider.required_fields() {
            if company.credentials.field(provider, field).is_none() {
                return fail(
                    format!("company.credentials.{}.{}", provider, field),
                    Rule::Missing,
                    "must be set",
                );
            }
        }
    }

    for (provider, credential) in company.credentials.iter() {
        if let Some((field, _)) = credential.iter().find(|(_, v)| v.trim().is_empty()) {
            return fail(
                format!("company.credentials.{}.{}", provider, field),
                Rule::Missing,
                "must not be empty",
            );
        }
    }

    debug!(company = %company.name, "company validated");
    Ok(())
}

fn domain_charset(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn environments(field: &str, values: &[String]) -> Result<()> {
    if let Some(bad) = values.iter().find(|v| v.parse::<EnvName>().is_err()) {
        return fail(
            field,
            Rule::Membership,
            format!(
                "'{}' is invalid, it must only include one, some, or all of dev, test, qc, production",
                bad
            ),
        );
    }
    Ok(())
}

/// Validate one website instance's structure.
pub fn validate_instance(
    service: &str,
    instance: &WebsiteInstance,
    catalog: Option<&SoftwareCatalog>,
) -> Result<()> {
    let at = |field: &str| format!("websites.{}[{}].{}", service, instance.domain, field);
    let domain = instance.domain.as_str();

    if domain.is_empty() {
        return fail(at("domain"), Rule::Missing, "must be set");
    }
    if domain.contains("://") {
        return fail(at("domain"), Rule::Protocol, "must not include the protocol");
    }
    if !domain_charset(domain) {
        return fail(
            at("domain"),
            Rule::Charset,
            "must only contain letters, numbers, hyphens and periods",
        );
    }
    if domain.split('.').count() > 3 {
        return fail(
            at("domain"),
            Rule::Depth,
            "must not exceed one subdomain level (example.com, www.example.com)",
        );
    }

    let tld_override = instance.domain_tld_override.as_deref().unwrap_or("");
    if !tld_override.is_empty() {
        if tld_override.contains("://") {
            return fail(
                at("domain_tld_override"),
                Rule::Protocol,
                "must not include the protocol",
            );
        }
        if !domain_charset(tld_override) {
            return fail(
                at("domain_tld_override"),
                Rule::Charset,
                "must only contain letters, numbers, hyphens and periods",
            );
        }
        if tld_override.split('.').count() != 2 {
            return fail(
                at("domain_tld_override"),
                Rule::Depth,
                "must be exactly one domain and tld (mycompany.com)",
            );
        }
    }
    if domain.len() + tld_override.len() > constants::MAX_DOMAIN_LENGTH {
        return fail(
            at("domain"),
            Rule::Length,
            format!(
                "domain and domain_tld_override together must not exceed {} characters",
                constants::MAX_DOMAIN_LENGTH
            ),
        );
    }

    if let Some(auth) = &instance.force_auth {
        let len = auth.chars().count();
        if !(10..=20).contains(&len) || !auth.chars().all(|c| c.is_ascii_alphanumeric()) {
            return fail(
                at("force_auth"),
                Rule::Format,
                "must be 10 to 20 letters and numbers",
            );
        }
    }
    if let Some(exclude) = &instance.force_auth_exclude {
        if instance.force_auth.is_none() {
            return fail(at("force_auth_exclude"), Rule::Dependency, "requires force_auth to be set");
        }
        environments(&at("force_auth_exclude"), exclude)?;
    }

    if instance.force_https == Some(false) {
        return fail(at("force_https"), Rule::Format, "must be true or removed");
    }

    if let Some(ips) = &instance.force_ip {
        if let Some(bad) = ips.iter().find(|ip| ip.parse::<IpAddr>().is_err()) {
            return fail(
                at("force_ip"),
                Rule::Format,
                format!("'{}' is not a valid IPv4 or IPv6 address", bad),
            );
        }
    }
    if let Some(exclude) = &instance.force_ip_exclude {
        if instance.force_ip.is_none() {
            return fail(at("force_ip_exclude"), Rule::Dependency, "requires force_ip to be set");
        }
        environments(&at("force_ip_exclude"), exclude)?;
    }

    if let Some(software) = &instance.software {
        if let Some(catalog) = catalog {
            let names = catalog.names(service);
            if !names.contains(&software.as_str()) {
                return fail(
                    at("software"),
                    Rule::Membership,
                    format!("must be one of the following: {}", names.join(", ")),
                );
            }
        }
        if instance.software_auto_update == Some(false) {
            return fail(at("software_auto_update"), Rule::Format, "must be true or not set");
        }
        if let Some(prefix) = &instance.software_dbprefix {
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return fail(
                    at("software_dbprefix"),
                    Rule::Charset,
                    "must only contain numbers, letters, and underscores",
                );
            }
        }
        match instance.software_workflow.as_deref() {
            None => {
                return fail(at("software_workflow"), Rule::Missing, "must be set with software")
            }
            Some(value) if Workflow::parse(value).is_none() => {
                return fail(
                    at("software_workflow"),
                    Rule::Membership,
                    "must be one of the following: downstream, upstream",
                )
            }
            Some(_) => {}
        }
    }

    if let Some(webroot) = &instance.webroot {
        if !webroot.ends_with('/') {
            return fail(at("webroot"), Rule::Format, "must include a trailing slash");
        }
    }

    if service != constants::CORE_SERVICE {
        let Some(repo) = RepoRef::parse(&instance.repo) else {
            return fail(
                at("repo"),
                Rule::Repository,
                "the format must be git@github.com:owner/name.git",
            );
        };
        if !repo.is_ssh() {
            return fail(
                at("repo"),
                Rule::Repository,
                "the format must be git@github.com:owner/name.git",
            );
        }
        if !constants::ALLOWED_REPO_HOSTS.contains(&repo.host.as_str()) {
            return fail(
                at("repo"),
                Rule::Repository,
                "it must either be a bitbucket.org or github.com repository",
            );
        }
    }

    Ok(())
}

/// Domains of one service must be in case-sensitive alphabetical order.
pub fn validate_order(service: &str, instances: &[WebsiteInstance]) -> Result<()> {
    for pair in instances.windows(2) {
        if pair[0].domain > pair[1].domain {
            return fail(
                format!("websites.{}", service),
                Rule::Order,
                format!(
                    "websites must be in alphabetical order by domain; {} must come before {}",
                    pair[1].domain, pair[0].domain
                ),
            );
        }
    }
    Ok(())
}

fn validate_repository(
    service: &str,
    instance: &WebsiteInstance,
    host: &dyn RepositoryHost,
) -> Result<Option<String>> {
    let Some(repo) = RepoRef::parse(&instance.repo) else {
        return Ok(None);
    };
    let field = format!("websites.{}[{}].repo", service, instance.domain);

    let facts = match host.probe(&repo)? {
        Probe::Found(facts) => facts,
        Probe::Unavailable(reason) => {
            warn!(repo = %instance.repo, %reason, "repository host unavailable");
            return Ok(Some(format!(
                "The {} API seems to be down, skipping... (this may impact {})",
                repo.host,
                constants::DEGRADED_CAPABILITIES
            )));
        }
    };

    if !facts.exists {
        fail(&field, Rule::Repository, format!("{} does not exist", instance.repo))?;
    }
    if !facts.writable {
        fail(
            &field,
            Rule::Repository,
            format!("the configured user does not have write access to {}", instance.repo),
        )?;
    }
    if facts.empty {
        fail(
            &field,
            Rule::Repository,
            format!(
                "{} is empty, please initialize with a README or similar file",
                instance.repo
            ),
        )?;
    }
    for branch in constants::CANONICAL_BRANCHES {
        if !facts.branches.iter().any(|b| b == branch) {
            fail(
                &field,
                Rule::Repository,
                format!("{} does not have a {} branch", instance.repo, branch),
            )?;
        }
    }

    Ok(None)
}

/// Validate every website, returning warnings for unreachable code hosts.
///
/// # Errors
///
/// Returns the first `ValidationError`, or `ProviderError::Auth` from a probe.
pub fn validate_websites(
    config: &Configuration,
    catalog: Option<&SoftwareCatalog>,
    host: Option<&dyn RepositoryHost>,
) -> Result<Vec<String>> {
    for (service, instances) in &config.websites {
        for instance in instances {
            validate_instance(service, instance, catalog)?;
        }
        validate_order(service, instances)?;
    }

    let mut warnings = Vec::new();
    if let Some(host) = host {
        for (service, instances) in &config.websites {
            if service == constants::CORE_SERVICE {
                continue;
            }
            for instance in instances {
                if let Some(warning) = validate_repository(service, instance, host)? {
                    warnings.push(warning);
                }
            }
        }
    }

    debug!(
        services = config.websites.len(),
        warnings = warnings.len(),
        "websites validated"
    );
    Ok(warnings)
}
