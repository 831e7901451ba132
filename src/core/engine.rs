//! One reconciliation run.
//!
//! The order is fixed: lock, classify the branch, pull, unlock, validate,
//! reconcile, seal, push, release. Nothing is encrypted or pushed until
//! validation has passed. Everything the run touches is carried in a
//! [`Context`].

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::core::cipher::Cipher;
use crate::core::domain::{Company, Configuration, ProviderName};
use crate::core::layout::{Layout, SecretKind};
use crate::core::lifecycle::{Lifecycle, Persisted};
use crate::core::lock::{LockGuard, LockOptions};
use crate::core::provider::{Aws, DigitalOcean, Provider, VirtualBox};
use crate::core::reconcile::{InstanceStatus, Providers, Reconciler, Remediation};
use crate::core::repository::{HttpRepositoryHost, RepositoryHost};
use crate::core::settings::Settings;
use crate::core::validation::{self, SoftwareCatalog};
use crate::core::vcs::{self, hook, BranchState, Vcs};
use crate::error::Result;

/// Provider readers and repository host built from the decrypted company.
pub struct Connected {
    pub local: Box<dyn Provider>,
    pub windows: Box<dyn Provider>,
    pub redhat: Box<dyn Provider>,
    pub host: Option<Box<dyn RepositoryHost>>,
}

/// Builds the remote collaborators once credentials are known.
pub trait Connector {
    fn connect(&self, company: &Company, timeout: Duration) -> Result<Connected>;
}

/// Connects to the real provider APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveConnector;

impl Connector for LiveConnector {
    fn connect(&self, company: &Company, timeout: Duration) -> Result<Connected> {
        let field = |provider: ProviderName, name: &str| {
            company
                .credentials
                .field(provider, name)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Connected {
            local: Box::new(VirtualBox::new()),
            windows: Box::new(Aws::new(
                field(ProviderName::Aws, "access_key"),
                field(ProviderName::Aws, "secret_key"),
                timeout,
            )),
            redhat: Box::new(DigitalOcean::new(
                field(ProviderName::DigitalOcean, "token"),
                timeout,
            )?),
            host: Some(Box::new(HttpRepositoryHost::new(company, timeout)?)),
        })
    }
}

/// Run switches.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Pull and push the branch with its remote.
    pub sync: bool,
    pub lock: LockOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sync: true,
            lock: LockOptions::default(),
        }
    }
}

/// Everything a run needs.
pub struct Context<'a> {
    pub layout: &'a Layout,
    pub settings: &'a Settings,
    pub vcs: &'a dyn Vcs,
    pub cipher: &'a dyn Cipher,
    pub connector: &'a dyn Connector,
    pub today: NaiveDate,
    pub options: RunOptions,
}

/// What a run did.
#[derive(Debug)]
pub struct RunReport {
    pub branch: BranchState,
    /// Blobs re-encrypted from hand edits.
    pub reencrypted: Vec<SecretKind>,
    /// `None` when reconciliation found nothing to write.
    pub persisted: Option<Persisted>,
    pub warnings: Vec<String>,
    pub remediations: Vec<Remediation>,
    pub instances: Vec<InstanceStatus>,
    pub configuration: Configuration,
}

/// Execute one run under the advisory lock.
///
/// # Errors
///
/// Any fatal error aborts the run. The lock is released on every path.
pub fn run(ctx: &Context<'_>) -> Result<RunReport> {
    let _lock = LockGuard::acquire(ctx.layout.root(), ctx.options.lock)?;

    let branch = ctx.vcs.current_branch()?;
    let state = BranchState::classify(&branch)?;
    info!(branch = %state, "starting run");

    if ctx.options.sync {
        vcs::update(ctx.vcs, state, ctx.layout)?;
    } else {
        debug!("sync disabled");
    }

    ctx.layout.ensure_gitignore()?;
    if ctx.layout.git_hooks_dir().exists() && !hook::is_installed(ctx.layout) {
        hook::install(ctx.layout)?;
    }

    let lifecycle = Lifecycle::new(
        ctx.layout,
        ctx.cipher,
        &ctx.settings.passphrase,
        ctx.settings.edit,
        ctx.today,
    );
    let unlocked = lifecycle.unlock(state, ctx.vcs)?;
    let edits = unlocked.edits;
    let mut configuration = unlocked.configuration;

    validation::validate_company(&configuration.company)?;
    let catalog = SoftwareCatalog::load(&ctx.layout.software_catalog())?;
    if catalog.is_none() {
        debug!("no software catalog, skipping software membership checks");
    }

    let connected = ctx
        .connector
        .connect(&configuration.company, ctx.settings.provider_timeout)?;
    let mut warnings =
        validation::validate_websites(&configuration, catalog.as_ref(), connected.host.as_deref())?;

    let providers = Providers {
        local: connected.local.as_ref(),
        windows: connected.windows.as_ref(),
        redhat: connected.redhat.as_ref(),
    };
    let report = Reconciler::new(providers).reconcile(&mut configuration)?;
    warnings.extend(report.warnings);

    let reconciled = report.changed.then_some(&configuration);
    let persisted = lifecycle.seal(state, &edits, reconciled)?;

    if ctx.options.sync {
        vcs::publish(ctx.vcs, state)?;
    }

    info!(branch = %state, changed = report.changed, "run complete");

    Ok(RunReport {
        branch: state,
        reencrypted: edits.kinds(),
        persisted,
        warnings,
        remediations: report.remediations,
        instances: report.instances,
        configuration,
    })
}
