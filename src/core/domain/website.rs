//! Website instances.

use serde::{Deserialize, Serialize};

/// Direction database content flows between environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    /// Production is the source of truth.
    Downstream,
    /// Test is the source of truth.
    Upstream,
}

impl Workflow {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "downstream" => Some(Self::Downstream),
            "upstream" => Some(Self::Upstream),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downstream => "downstream",
            Self::Upstream => "upstream",
        }
    }
}

/// One website under a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteInstance {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_tld_override: Option<String>,
    #[serde(default)]
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_auth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_auth_exclude: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_https: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_ip: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_ip_exclude: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_auto_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_dbprefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_dbtable_retain: Option<Vec<String>>,
    /// `upstream` or `downstream`. Kept as text so validation can name a bad value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webroot: Option<String>,
}

impl WebsiteInstance {
    pub fn new(domain: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            repo: repo.into(),
            ..Default::default()
        }
    }

    pub fn workflow(&self) -> Option<Workflow> {
        self.software_workflow.as_deref().and_then(Workflow::parse)
    }
}
