//! The declarative configuration document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Environments, WebsiteInstance};
use crate::core::types::ServiceName;
use crate::error::{ConfigError, Result};

/// Root of `secrets/configuration.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub company: Company,
    #[serde(default)]
    pub environments: Environments,
    /// Websites keyed by service (`apache`, `iis`, ...).
    #[serde(default)]
    pub websites: BTreeMap<ServiceName, Vec<WebsiteInstance>>,
}

impl Configuration {
    /// Parse a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed documents, including any
    /// environment outside the closed set.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e).into())
    }

    /// Parse decrypted plaintext bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let contents = String::from_utf8_lossy(bytes);
        Self::from_toml(&contents)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e).into())
    }

    /// Find a website by service and domain.
    pub fn website(&self, service: &str, domain: &str) -> Option<&WebsiteInstance> {
        self.websites
            .get(service)
            .and_then(|instances| instances.iter().find(|w| w.domain == domain))
    }
}

/// Company identity and third-party credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub timezone_redhat: String,
    #[serde(default)]
    pub timezone_windows: String,
    /// URI of the team's own configuration repository.
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Named string fields of one provider credential (`token`, `username`, ...).
pub type Credential = BTreeMap<String, String>;

/// Third-party services a company may hold credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProviderName {
    DigitalOcean,
    Aws,
    Github,
    Bitbucket,
    Bamboo,
    Cloudflare,
    NewRelic,
    SendGrid,
}

impl ProviderName {
    pub const ALL: [ProviderName; 8] = [
        Self::DigitalOcean,
        Self::Aws,
        Self::Github,
        Self::Bitbucket,
        Self::Bamboo,
        Self::Cloudflare,
        Self::NewRelic,
        Self::SendGrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitalOcean => "digitalocean",
            Self::Aws => "aws",
            Self::Github => "github",
            Self::Bitbucket => "bitbucket",
            Self::Bamboo => "bamboo",
            Self::Cloudflare => "cloudflare",
            Self::NewRelic => "newrelic",
            Self::SendGrid => "sendgrid",
        }
    }

    /// Fields that must be present and non-empty.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::DigitalOcean => &["token"],
            Self::Aws => &["access_key", "secret_key"],
            Self::Github | Self::Bitbucket => &["username", "password"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials per provider. Unknown providers are rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalocean: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bamboo: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newrelic: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sendgrid: Option<Credential>,
}

impl Credentials {
    pub fn get(&self, provider: ProviderName) -> Option<&Credential> {
        match provider {
            ProviderName::DigitalOcean => self.digitalocean.as_ref(),
            ProviderName::Aws => self.aws.as_ref(),
            ProviderName::Github => self.github.as_ref(),
            ProviderName::Bitbucket => self.bitbucket.as_ref(),
            ProviderName::Bamboo => self.bamboo.as_ref(),
            ProviderName::Cloudflare => self.cloudflare.as_ref(),
            ProviderName::NewRelic => self.newrelic.as_ref(),
            ProviderName::SendGrid => self.sendgrid.as_ref(),
        }
    }

    /// A single credential field, if present and non-empty.
    pub fn field(&self, provider: ProviderName, field: &str) -> Option<&str> {
        self.get(provider)
            .and_then(|c| c.get(field))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Declared credentials in provider order.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderName, &Credential)> {
        ProviderName::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|c| (p, c)))
    }
}
