//! Provider state readers.
//!
//! Each reader lists the instances one provider knows about and normalizes
//! its status vocabulary to a single `running` flag. Only a running instance
//! is trustworthy; anything else is treated the same as not found.
//!
//! ## Readers
//!
//! - **virtualbox**: local Vagrant machine index, used for `dev`.
//! - **aws**: EC2, used for Windows roles. Enable with `--features aws`.
//! - **digitalocean**: droplets, used for Red Hat roles.

use std::fmt;

use crate::core::domain::{EnvName, ServerRole};
use crate::core::types::InstanceName;
use crate::error::{ProviderError, Result};

pub mod aws;
pub mod digitalocean;
pub mod virtualbox;

pub use aws::Aws;
pub use digitalocean::DigitalOcean;
pub use virtualbox::VirtualBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    VirtualBox,
    Aws,
    DigitalOcean,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VirtualBox => "virtualbox",
            Self::Aws => "aws",
            Self::DigitalOcean => "digitalocean",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instance as reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFact {
    pub name: InstanceName,
    /// Native status text.
    pub status: String,
    /// True only when `status` is the provider's canonical running value.
    pub running: bool,
    pub id: Option<String>,
    /// AWS instance type or DigitalOcean size slug.
    pub instance_type: Option<String>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    /// DigitalOcean kernel id, when the droplet reports one.
    pub kernel: Option<u64>,
}

/// Result of listing a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Available(Vec<InstanceFact>),
    /// Network error, timeout or 5xx. Keep last known values.
    Unavailable(String),
}

/// A provider state reader.
pub trait Provider {
    fn kind(&self) -> ProviderKind;

    /// List every instance the provider knows.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Auth` when the provider rejects the credentials.
    fn list_instances(&self) -> Result<Listing>;

    /// Valid instance sizes, when the provider publishes them.
    fn catalog(&self) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    /// Switch an instance to another kernel.
    fn change_kernel(&self, id: &str, kernel: u64) -> Result<()> {
        let _ = (id, kernel);
        Err(ProviderError::Remediation {
            provider: self.kind().as_str(),
            reason: "kernel changes are not supported".to_string(),
        }
        .into())
    }
}

/// Deterministic instance name, `{company}-{env}-{role}` with `_` as `-`.
pub fn instance_name(company: &str, env: EnvName, role: ServerRole) -> InstanceName {
    format!(
        "{}-{}-{}",
        company.to_lowercase(),
        env.as_str(),
        role.as_str().replace('_', "-")
    )
}

/// The fact for `name`, preferring a running instance among duplicates.
pub fn find<'a>(facts: &'a [InstanceFact], name: &str) -> Option<&'a InstanceFact> {
    let mut matches = facts.iter().filter(|f| f.name == name);
    let first = matches.next()?;
    if first.running {
        return Some(first);
    }
    Some(matches.find(|f| f.running).unwrap_or(first))
}
