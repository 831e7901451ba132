//! Domain types.

mod configuration;
mod environment;
mod website;

pub use configuration::{Company, Configuration, Credential, Credentials, ProviderName};
pub use environment::{
    EnvName, Environment, Environments, MssqlCredentials, MysqlCredentials, Platform, ServerRole,
    ServerSpec, Servers, SoftwareAdmin, SoftwareDefaults,
};
pub use website::{WebsiteInstance, Workflow};
