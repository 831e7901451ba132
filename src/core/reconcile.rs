//! Reconciliation of declared servers against provider facts.
//!
//! For every declared environment and server role the matching provider is
//! asked about the instance named `{company}-{env}-{role}`. A running
//! instance overwrites the stored `ip`, `ip_private`, `type` or `slug`, and
//! `id` when they differ; an unavailable provider or a missing instance
//! leaves the record untouched.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::core::constants;
use crate::core::domain::{Configuration, EnvName, Platform, ServerRole, ServerSpec, Servers};
use crate::core::generate;
use crate::core::provider::{self, InstanceFact, Listing, Provider, ProviderKind};
use crate::core::types::InstanceName;
use crate::core::validation::Rule;
use crate::error::{Result, ValidationError};

/// The three readers a run consults.
#[derive(Clone, Copy)]
pub struct Providers<'a> {
    /// Local virtualization, for `dev`.
    pub local: &'a dyn Provider,
    /// Windows roles outside `dev`.
    pub windows: &'a dyn Provider,
    /// Red Hat roles outside `dev`.
    pub redhat: &'a dyn Provider,
}

impl<'a> Providers<'a> {
    pub fn select(&self, env: EnvName, role: ServerRole) -> &'a dyn Provider {
        match (env, role.platform()) {
            (EnvName::Dev, _) => self.local,
            (_, Platform::Windows) => self.windows,
            (_, Platform::RedHat) => self.redhat,
        }
    }
}

/// What was seen for one environment and role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    pub env: EnvName,
    pub role: ServerRole,
    pub provider: ProviderKind,
    pub name: InstanceName,
    /// `None` when the provider was unavailable.
    pub available: bool,
    pub fact: Option<InstanceFact>,
}

/// A corrective action issued against a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    pub instance: InstanceName,
    pub action: String,
    /// Failure reason; retried next run.
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub changed: bool,
    pub warnings: Vec<String>,
    pub remediations: Vec<Remediation>,
    pub instances: Vec<InstanceStatus>,
}

/// Merges provider facts into a configuration, listing each provider once.
pub struct Reconciler<'a> {
    providers: Providers<'a>,
    listings: HashMap<ProviderKind, Listing>,
    catalogs: HashMap<ProviderKind, Option<Vec<String>>>,
}

fn differs(current: &Option<String>, discovered: &Option<String>) -> bool {
    discovered.is_some() && current != discovered
}

/// Overwrite discovered fields that differ. Returns whether anything changed.
fn merge(servers: &mut Servers, role: ServerRole, kind: ProviderKind, fact: &InstanceFact) -> bool {
    let empty = ServerSpec::default();
    let current = servers.get(role).unwrap_or(&empty);
    let size_slot = |spec: &ServerSpec| match kind {
        ProviderKind::DigitalOcean => spec.slug.clone(),
        _ => spec.instance_type.clone(),
    };

    let needed = differs(&current.ip, &fact.public_ip)
        || differs(&current.ip_private, &fact.private_ip)
        || differs(&size_slot(current), &fact.instance_type)
        || differs(&current.id, &fact.id);
    if !needed {
        return false;
    }

    let spec = servers.ensure(role);
    if fact.public_ip.is_some() {
        spec.ip = fact.public_ip.clone();
    }
    if fact.private_ip.is_some() {
        spec.ip_private = fact.private_ip.clone();
    }
    if fact.instance_type.is_some() {
        match kind {
            ProviderKind::DigitalOcean => spec.slug = fact.instance_type.clone(),
            _ => spec.instance_type = fact.instance_type.clone(),
        }
    }
    if fact.id.is_some() {
        spec.id = fact.id.clone();
    }
    info!(instance = %fact.name, "discovered changes");
    true
}

impl<'a> Reconciler<'a> {
    pub fn new(providers: Providers<'a>) -> Self {
        Self {
            providers,
            listings: HashMap::new(),
            catalogs: HashMap::new(),
        }
    }

    fn listing(&mut self, provider: &dyn Provider, warnings: &mut Vec<String>) -> Result<&Listing> {
        let kind = provider.kind();
        if !self.listings.contains_key(&kind) {
            let listing = provider.list_instances()?;
            if let Listing::Unavailable(reason) = &listing {
                warn!(provider = %kind, %reason, "provider unavailable");
                warnings.push(format!(
                    "The {} API seems to be down, skipping... ({}) (this may impact {})",
                    kind,
                    reason,
                    constants::DEGRADED_CAPABILITIES
                ));
            }
            self.listings.insert(kind, listing);
        }
        Ok(&self.listings[&kind])
    }

    fn catalog(&mut self, provider: &dyn Provider) -> Result<Option<Vec<String>>> {
        let kind = provider.kind();
        if !self.catalogs.contains_key(&kind) {
            let catalog = provider.catalog()?;
            self.catalogs.insert(kind, catalog);
        }
        Ok(self.catalogs[&kind].clone())
    }

    fn check_slug(
        &mut self,
        provider: &dyn Provider,
        env: EnvName,
        role: ServerRole,
        slug: Option<&str>,
    ) -> Result<()> {
        let catalog = self.catalog(provider)?;
        let choices = catalog
            .as_ref()
            .map(|c| c.join(", "))
            .unwrap_or_else(|| "(size list unavailable)".to_string());
        let field = format!("environments.{}.servers.{}.slug", env, role);

        match slug.filter(|s| !s.is_empty()) {
            None => Err(ValidationError::new(
                field,
                Rule::Missing,
                format!(
                    "the droplet size is empty and the droplet has not been created; choose from: {}",
                    choices
                ),
            )
            .into()),
            Some(slug) => match &catalog {
                Some(sizes) if !sizes.iter().any(|s| s == slug) => Err(ValidationError::new(
                    field,
                    Rule::Membership,
                    format!("'{}' is not a droplet size; choose from: {}", slug, choices),
                )
                .into()),
                _ => Ok(()),
            },
        }
    }

    /// Merge provider facts and generate missing credentials.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Auth` from a provider, or a `ValidationError`
    /// for a Red Hat server whose droplet size is unknown or invalid.
    pub fn reconcile(&mut self, config: &mut Configuration) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let company = config.company.name.clone();

        for env in config.environments.declared() {
            let Some(environment) = config.environments.get_mut(env) else {
                continue;
            };

            for role in ServerRole::ALL {
                let provider = self.providers.select(env, role);
                let kind = provider.kind();
                let name = provider::instance_name(&company, env, role);
                let declared = environment
                    .servers
                    .get(role)
                    .is_some_and(ServerSpec::declares_instance);

                let (available, fact) = match self.listing(provider, &mut report.warnings)? {
                    Listing::Available(facts) => (true, provider::find(facts, &name).cloned()),
                    Listing::Unavailable(_) => (false, None),
                };
                debug!(
                    env = %env,
                    role = %role,
                    instance = %name,
                    found = fact.is_some(),
                    "matched instance"
                );

                report.instances.push(InstanceStatus {
                    env,
                    role,
                    provider: kind,
                    name: name.clone(),
                    available,
                    fact: fact.clone(),
                });

                // local machine facts are for display only
                if env == EnvName::Dev {
                    continue;
                }

                if let Some(fact) = fact.as_ref().filter(|f| f.running) {
                    report.changed |= merge(&mut environment.servers, role, kind, fact);

                    if kind == ProviderKind::DigitalOcean {
                        if let (Some(kernel), Some(id)) = (fact.kernel, fact.id.as_deref()) {
                            if kernel != constants::REQUIRED_KERNEL_ID {
                                let failure = provider
                                    .change_kernel(id, constants::REQUIRED_KERNEL_ID)
                                    .err()
                                    .map(|e| e.to_string());
                                if let Some(reason) = &failure {
                                    warn!(instance = %name, %reason, "kernel remediation failed");
                                }
                                report.remediations.push(Remediation {
                                    instance: name.clone(),
                                    action: format!(
                                        "change kernel {} to {}",
                                        kernel,
                                        constants::REQUIRED_KERNEL_ID
                                    ),
                                    failure,
                                });
                            }
                        }
                    }
                }

                if declared && kind == ProviderKind::DigitalOcean {
                    let slug = environment
                        .servers
                        .get(role)
                        .and_then(|s| s.slug.clone());
                    self.check_slug(provider, env, role, slug.as_deref())?;
                }
            }

            if generate::fill_credentials(env, environment) > 0 {
                report.changed = true;
            }
        }

        debug!(changed = report.changed, "reconciled");
        Ok(report)
    }
}
