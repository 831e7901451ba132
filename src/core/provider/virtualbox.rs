//! Local virtualization reader.
//!
//! Reads Vagrant's machine index. Facts from here are used for status only.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{InstanceFact, Listing, Provider, ProviderKind};
use crate::error::{ProviderError, Result};

const RUNNING: &str = "running";

#[derive(Debug, Deserialize)]
struct MachineIndex {
    #[serde(default)]
    machines: BTreeMap<String, Machine>,
}

#[derive(Debug, Deserialize)]
struct Machine {
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
}

/// Parse the machine index JSON.
pub fn parse_index(contents: &str) -> serde_json::Result<Vec<InstanceFact>> {
    let index: MachineIndex = serde_json::from_str(contents)?;
    Ok(index
        .machines
        .into_iter()
        .map(|(id, machine)| InstanceFact {
            running: machine.state == RUNNING,
            name: machine.name,
            status: machine.state,
            id: Some(id),
            ..Default::default()
        })
        .collect())
}

pub struct VirtualBox {
    index: Option<PathBuf>,
}

impl VirtualBox {
    /// Reader over `~/.vagrant.d/data/machine-index/index`.
    pub fn new() -> Self {
        Self {
            index: dirs::home_dir().map(|home| {
                home.join(".vagrant.d")
                    .join("data")
                    .join("machine-index")
                    .join("index")
            }),
        }
    }

    pub fn with_index(path: impl Into<PathBuf>) -> Self {
        Self {
            index: Some(path.into()),
        }
    }
}

impl Default for VirtualBox {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for VirtualBox {
    fn kind(&self) -> ProviderKind {
        ProviderKind::VirtualBox
    }

    fn list_instances(&self) -> Result<Listing> {
        let Some(path) = &self.index else {
            return Ok(Listing::Unavailable("home directory not found".to_string()));
        };

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no machine index");
                return Ok(Listing::Available(Vec::new()));
            }
            Err(source) => {
                return Err(ProviderError::Io {
                    path: path.clone(),
                    source,
                }
                .into())
            }
        };

        match parse_index(&contents) {
            Ok(facts) => {
                debug!(machines = facts.len(), "read machine index");
                Ok(Listing::Available(facts))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed machine index");
                Ok(Listing::Unavailable(format!("malformed machine index: {}", e)))
            }
        }
    }
}
