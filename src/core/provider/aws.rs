//! AWS EC2 reader.
//!
//! Instances are matched by their `Name` tag. The SDK is async, so each
//! listing runs on a current-thread tokio runtime. The `aws` feature is on
//! by default; a build with `--no-default-features` reports the reader
//! unavailable.

use std::time::Duration;

#[cfg(feature = "aws")]
use tracing::debug;

use super::{InstanceFact, Listing, Provider, ProviderKind};
use crate::error::Result;

const RUNNING: &str = "running";

/// The EC2 us-east-1 region every catapult instance lives in.
#[cfg_attr(not(feature = "aws"), allow(dead_code))]
const REGION: &str = "us-east-1";

/// An EC2 instance reduced to the fields the reconciler reads.
#[derive(Debug, Clone, Default)]
pub struct Ec2Instance {
    pub name: Option<String>,
    pub state: Option<String>,
    pub id: Option<String>,
    pub instance_type: Option<String>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

/// Normalize EC2 instances. Instances without a `Name` tag cannot be matched.
pub fn normalize(instances: Vec<Ec2Instance>) -> Vec<InstanceFact> {
    instances
        .into_iter()
        .filter_map(|i| {
            let name = i.name?;
            let status = i.state.unwrap_or_default();
            Some(InstanceFact {
                running: status == RUNNING,
                name,
                status,
                id: i.id,
                instance_type: i.instance_type,
                public_ip: i.public_ip,
                private_ip: i.private_ip,
                kernel: None,
            })
        })
        .collect()
}

pub struct Aws {
    #[cfg_attr(not(feature = "aws"), allow(dead_code))]
    access_key: String,
    #[cfg_attr(not(feature = "aws"), allow(dead_code))]
    secret_key: String,
    #[cfg_attr(not(feature = "aws"), allow(dead_code))]
    timeout: Duration,
}

impl Aws {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            timeout,
        }
    }
}

impl Provider for Aws {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    #[cfg(not(feature = "aws"))]
    fn list_instances(&self) -> Result<Listing> {
        Ok(Listing::Unavailable(
            "EC2 support not compiled. Rebuild with: cargo install catapult --features aws"
                .to_string(),
        ))
    }

    #[cfg(feature = "aws")]
    fn list_instances(&self) -> Result<Listing> {
        use crate::error::{Error, ProviderError};

        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => return Ok(Listing::Unavailable(format!("failed to create runtime: {}", e))),
        };

        rt.block_on(async {
            let credentials = aws_sdk_ec2::config::Credentials::new(
                self.access_key.clone(),
                self.secret_key.clone(),
                None,
                None,
                "catapult",
            );
            let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(REGION))
                .credentials_provider(credentials)
                .timeout_config(
                    aws_config::timeout::TimeoutConfig::builder()
                        .operation_timeout(self.timeout)
                        .build(),
                )
                .load()
                .await;
            let client = aws_sdk_ec2::Client::new(&config);

            let output = match client.describe_instances().send().await {
                Ok(output) => output,
                Err(e) => {
                    let status = e.raw_response().map(|r| r.status().as_u16());
                    return match status {
                        Some(status) if (400..500).contains(&status) => {
                            Err(Error::from(ProviderError::Auth {
                                provider: "aws",
                                status,
                            }))
                        }
                        _ => Ok(Listing::Unavailable(e.to_string())),
                    };
                }
            };

            let instances = output
                .reservations()
                .iter()
                .flat_map(|r| r.instances())
                .map(|i| Ec2Instance {
                    name: i
                        .tags()
                        .iter()
                        .find(|t| t.key() == Some("Name"))
                        .and_then(|t| t.value())
                        .map(String::from),
                    state: i
                        .state()
                        .and_then(|s| s.name())
                        .map(|n| n.as_str().to_string()),
                    id: i.instance_id().map(String::from),
                    instance_type: i.instance_type().map(|t| t.as_str().to_string()),
                    public_ip: i.public_ip_address().map(String::from),
                    private_ip: i.private_ip_address().map(String::from),
                })
                .collect();

            let facts = normalize(instances);
            debug!(instances = facts.len(), "listed ec2 instances");
            Ok(Listing::Available(facts))
        })
    }
}
