//! Fakes for the VCS, providers and repository host.
//!
//! Every fake records its calls behind an `Arc<Mutex<_>>` so tests can
//! inspect them after the fake has been boxed into a run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use catapult::core::constants;
use catapult::core::domain::Company;
use catapult::core::engine::{Connected, Connector};
use catapult::core::provider::{InstanceFact, Listing, Provider, ProviderKind};
use catapult::core::repository::{Probe, RepoFacts, RepoRef, RepositoryHost};
use catapult::core::vcs::Vcs;
use catapult::error::{ProviderError, Result};

pub type Calls = Arc<Mutex<Vec<String>>>;

fn record(calls: &Calls, call: String) {
    calls.lock().unwrap().push(call);
}

/// A branch that never talks to a remote.
pub struct FakeVcs {
    pub branch: String,
    /// Whether `HEAD` differs from the remote branch.
    pub remote_ahead: bool,
    pub staged: Vec<String>,
    pub calls: Calls,
}

impl FakeVcs {
    pub fn on(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            remote_ahead: false,
            staged: Vec::new(),
            calls: Calls::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn checkout_path(&self, reference: &str, path: &str) -> Result<()> {
        record(&self.calls, format!("checkout {} -- {}", reference, path));
        Ok(())
    }

    fn unstage(&self, path: &str) -> Result<()> {
        record(&self.calls, format!("reset {}", path));
        Ok(())
    }

    fn has_diff(&self, a: &str, b: &str) -> Result<bool> {
        record(&self.calls, format!("diff {} {}", a, b));
        Ok(self.remote_ahead)
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        record(&self.calls, format!("fetch {}", remote));
        Ok(())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        record(&self.calls, format!("pull {} {}", remote, branch));
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        record(&self.calls, format!("push {} {}", remote, branch));
        Ok(())
    }

    fn staged_files(&self) -> Result<Vec<String>> {
        Ok(self.staged.clone())
    }
}

/// A provider with a fixed listing.
#[derive(Clone)]
pub struct FakeProvider {
    pub kind: ProviderKind,
    pub listing: Listing,
    pub sizes: Option<Vec<String>>,
    /// HTTP status returned instead of a listing.
    pub rejects: Option<u16>,
    pub kernel_fails: bool,
    pub calls: Calls,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind, facts: Vec<InstanceFact>) -> Self {
        Self {
            kind,
            listing: Listing::Available(facts),
            sizes: None,
            rejects: None,
            kernel_fails: false,
            calls: Calls::default(),
        }
    }

    /// A provider whose API refuses the credentials.
    pub fn rejecting(kind: ProviderKind, status: u16) -> Self {
        Self {
            rejects: Some(status),
            ..Self::new(kind, Vec::new())
        }
    }

    pub fn unavailable(kind: ProviderKind) -> Self {
        Self {
            listing: Listing::Unavailable("HTTP 503".to_string()),
            ..Self::new(kind, Vec::new())
        }
    }

    pub fn with_sizes(mut self, sizes: &[&str]) -> Self {
        self.sizes = Some(sizes.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Provider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn list_instances(&self) -> Result<Listing> {
        record(&self.calls, "list".to_string());
        if let Some(status) = self.rejects {
            return Err(ProviderError::Auth {
                provider: self.kind.as_str(),
                status,
            }
            .into());
        }
        Ok(self.listing.clone())
    }

    fn catalog(&self) -> Result<Option<Vec<String>>> {
        Ok(self.sizes.clone())
    }

    fn change_kernel(&self, id: &str, kernel: u64) -> Result<()> {
        record(&self.calls, format!("change_kernel {} {}", id, kernel));
        if self.kernel_fails {
            return Err(ProviderError::Remediation {
                provider: self.kind.as_str(),
                reason: "HTTP 422".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// A running DigitalOcean droplet.
pub fn droplet(name: &str, ip: &str) -> InstanceFact {
    InstanceFact {
        name: name.to_string(),
        status: "active".to_string(),
        running: true,
        id: Some("3164444".to_string()),
        instance_type: Some("s-1vcpu-1gb".to_string()),
        public_ip: Some(ip.to_string()),
        private_ip: Some("10.132.0.2".to_string()),
        kernel: Some(constants::REQUIRED_KERNEL_ID),
    }
}

/// A running EC2 instance.
pub fn ec2_instance(name: &str, ip: &str, instance_type: &str) -> InstanceFact {
    InstanceFact {
        name: name.to_string(),
        status: "running".to_string(),
        running: true,
        id: Some("i-0abc1234".to_string()),
        instance_type: Some(instance_type.to_string()),
        public_ip: Some(ip.to_string()),
        private_ip: Some("172.31.0.10".to_string()),
        kernel: None,
    }
}

/// A code host where every repository is healthy.
#[derive(Clone)]
pub struct FakeHost {
    pub probe: Probe,
    pub calls: Calls,
}

impl FakeHost {
    pub fn healthy() -> Self {
        Self {
            probe: Probe::Found(RepoFacts {
                exists: true,
                writable: true,
                empty: false,
                branches: constants::CANONICAL_BRANCHES
                    .iter()
                    .map(|b| b.to_string())
                    .collect(),
            }),
            calls: Calls::default(),
        }
    }
}

impl RepositoryHost for FakeHost {
    fn probe(&self, repo: &RepoRef) -> Result<Probe> {
        record(&self.calls, repo.full_name());
        Ok(self.probe.clone())
    }
}

/// Hands out clones of the configured fakes.
#[derive(Clone)]
pub struct FakeConnector {
    pub local: FakeProvider,
    pub windows: FakeProvider,
    pub redhat: FakeProvider,
    pub host: FakeHost,
}

impl FakeConnector {
    /// No instances anywhere and healthy repositories.
    pub fn empty() -> Self {
        Self {
            local: FakeProvider::new(ProviderKind::VirtualBox, Vec::new()),
            windows: FakeProvider::new(ProviderKind::Aws, Vec::new()),
            redhat: FakeProvider::new(ProviderKind::DigitalOcean, Vec::new())
                .with_sizes(super::DROPLET_SIZES),
            host: FakeHost::healthy(),
        }
    }

    pub fn with_droplets(mut self, facts: Vec<InstanceFact>) -> Self {
        self.redhat.listing = Listing::Available(facts);
        self
    }

    pub fn with_instances(mut self, facts: Vec<InstanceFact>) -> Self {
        self.windows.listing = Listing::Available(facts);
        self
    }
}

impl Connector for FakeConnector {
    fn connect(&self, _company: &Company, _timeout: Duration) -> Result<Connected> {
        Ok(Connected {
            local: Box::new(self.local.clone()),
            windows: Box::new(self.windows.clone()),
            redhat: Box::new(self.redhat.clone()),
            host: Some(Box::new(self.host.clone())),
        })
    }
}
