//! DigitalOcean droplet reader.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{InstanceFact, Listing, Provider, ProviderKind};
use crate::core::http::{self, Reply};
use crate::error::{ProviderError, Result};

const ACTIVE: &str = "active";
const PROVIDER: &str = "digitalocean";

#[derive(Debug, Deserialize)]
struct Droplets {
    #[serde(default)]
    droplets: Vec<Droplet>,
}

#[derive(Debug, Deserialize)]
struct Droplet {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    size: Option<Size>,
    #[serde(default)]
    size_slug: Option<String>,
    #[serde(default)]
    networks: Networks,
    #[serde(default)]
    kernel: Option<Kernel>,
}

#[derive(Debug, Deserialize)]
struct Size {
    slug: String,
}

#[derive(Debug, Default, Deserialize)]
struct Networks {
    #[serde(default)]
    v4: Vec<Network>,
}

#[derive(Debug, Deserialize)]
struct Network {
    ip_address: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Kernel {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Sizes {
    #[serde(default)]
    sizes: Vec<Size>,
}

impl Droplet {
    fn address(&self, kind: &str) -> Option<String> {
        self.networks
            .v4
            .iter()
            .find(|n| n.kind == kind)
            .map(|n| n.ip_address.clone())
    }

    fn into_fact(self) -> InstanceFact {
        InstanceFact {
            running: self.status == ACTIVE,
            public_ip: self.address("public"),
            private_ip: self.address("private"),
            instance_type: self.size.map(|s| s.slug).or(self.size_slug),
            kernel: self.kernel.map(|k| k.id),
            id: Some(self.id.to_string()),
            name: self.name,
            status: self.status,
        }
    }
}

/// Normalize a `/v2/droplets` payload.
pub fn parse_droplets(body: &str) -> serde_json::Result<Vec<InstanceFact>> {
    let droplets: Droplets = serde_json::from_str(body)?;
    Ok(droplets
        .droplets
        .into_iter()
        .map(Droplet::into_fact)
        .collect())
}

/// Reader over the DigitalOcean v2 API.
pub struct DigitalOcean {
    client: Client,
    token: String,
    api: String,
}

impl DigitalOcean {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            token: token.into(),
            api: "https://api.digitalocean.com/v2".to_string(),
        })
    }

    /// Point at an alternative API root.
    pub fn with_endpoint(mut self, api: impl Into<String>) -> Self {
        self.api = api.into();
        self
    }
}

impl Provider for DigitalOcean {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DigitalOcean
    }

    fn list_instances(&self) -> Result<Listing> {
        let request = self
            .client
            .get(format!("{}/droplets?per_page=200", self.api))
            .bearer_auth(&self.token);

        let response = match http::send(PROVIDER, request, &[])? {
            Reply::Ok(response) => response,
            Reply::Unavailable(reason) => return Ok(Listing::Unavailable(reason)),
        };
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return Ok(Listing::Unavailable(e.to_string())),
        };

        match parse_droplets(&body) {
            Ok(facts) => {
                debug!(droplets = facts.len(), "listed droplets");
                Ok(Listing::Available(facts))
            }
            Err(e) => Ok(Listing::Unavailable(format!("malformed droplets payload: {}", e))),
        }
    }

    fn catalog(&self) -> Result<Option<Vec<String>>> {
        let request = self
            .client
            .get(format!("{}/sizes?per_page=200", self.api))
            .bearer_auth(&self.token);

        let response = match http::send(PROVIDER, request, &[])? {
            Reply::Ok(response) => response,
            Reply::Unavailable(_) => return Ok(None),
        };
        let sizes: Sizes = match http::json(PROVIDER, response) {
            Ok(sizes) => sizes,
            Err(_) => return Ok(None),
        };
        Ok(Some(sizes.sizes.into_iter().map(|s| s.slug).collect()))
    }

    fn change_kernel(&self, id: &str, kernel: u64) -> Result<()> {
        info!(droplet = id, kernel, "changing droplet kernel");

        let request = self
            .client
            .post(format!("{}/droplets/{}/actions", self.api, id))
            .bearer_auth(&self.token)
            .json(&json!({ "type": "change_kernel", "kernel": kernel }));

        match http::send(PROVIDER, request, &[]) {
            Ok(Reply::Ok(_)) => Ok(()),
            Ok(Reply::Unavailable(reason)) => Err(ProviderError::Remediation {
                provider: PROVIDER,
                reason,
            }
            .into()),
            Err(e) => Err(ProviderError::Remediation {
                provider: PROVIDER,
                reason: e.to_string(),
            }
            .into()),
        }
    }
}
