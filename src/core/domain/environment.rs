//! Environments and their server records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four deployment environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnvName {
    Dev,
    Test,
    Qc,
    Production,
}

impl EnvName {
    pub const ALL: [EnvName; 4] = [Self::Dev, Self::Test, Self::Qc, Self::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Qc => "qc",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for EnvName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown environment '{}'", s))
    }
}

/// The closed set of environments. Any other key fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<Environment>,
}

impl Environments {
    pub fn get(&self, name: EnvName) -> Option<&Environment> {
        match name {
            EnvName::Dev => self.dev.as_ref(),
            EnvName::Test => self.test.as_ref(),
            EnvName::Qc => self.qc.as_ref(),
            EnvName::Production => self.production.as_ref(),
        }
    }

    pub fn get_mut(&mut self, name: EnvName) -> Option<&mut Environment> {
        match name {
            EnvName::Dev => self.dev.as_mut(),
            EnvName::Test => self.test.as_mut(),
            EnvName::Qc => self.qc.as_mut(),
            EnvName::Production => self.production.as_mut(),
        }
    }

    /// Declared environment names in canonical order.
    pub fn declared(&self) -> Vec<EnvName> {
        EnvName::ALL
            .into_iter()
            .filter(|e| self.get(*e).is_some())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub servers: Servers,
    #[serde(default)]
    pub software: SoftwareDefaults,
}

/// Operating system family of a server role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    RedHat,
    Windows,
}

/// Server roles in an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerRole {
    Redhat,
    RedhatMysql,
    Windows,
    WindowsMssql,
}

impl ServerRole {
    pub const ALL: [ServerRole; 4] = [
        Self::Redhat,
        Self::RedhatMysql,
        Self::Windows,
        Self::WindowsMssql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redhat => "redhat",
            Self::RedhatMysql => "redhat_mysql",
            Self::Windows => "windows",
            Self::WindowsMssql => "windows_mssql",
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Redhat | Self::RedhatMysql => Platform::RedHat,
            Self::Windows | Self::WindowsMssql => Platform::Windows,
        }
    }
}

impl std::fmt::Display for ServerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server records of one environment, one optional slot per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Servers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redhat: Option<ServerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redhat_mysql: Option<ServerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<ServerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_mssql: Option<ServerSpec>,
}

impl Servers {
    fn slot(&mut self, role: ServerRole) -> &mut Option<ServerSpec> {
        match role {
            ServerRole::Redhat => &mut self.redhat,
            ServerRole::RedhatMysql => &mut self.redhat_mysql,
            ServerRole::Windows => &mut self.windows,
            ServerRole::WindowsMssql => &mut self.windows_mssql,
        }
    }

    pub fn get(&self, role: ServerRole) -> Option<&ServerSpec> {
        match role {
            ServerRole::Redhat => self.redhat.as_ref(),
            ServerRole::RedhatMysql => self.redhat_mysql.as_ref(),
            ServerRole::Windows => self.windows.as_ref(),
            ServerRole::WindowsMssql => self.windows_mssql.as_ref(),
        }
    }

    /// The record for `role`, created empty if absent.
    pub fn ensure(&mut self, role: ServerRole) -> &mut ServerSpec {
        self.slot(role).get_or_insert_with(ServerSpec::default)
    }
}

/// One server record. Every field is optional until discovered or generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_private: Option<String>,
    /// AWS instance type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    /// DigitalOcean droplet size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql: Option<MysqlCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mssql: Option<MssqlCredentials>,
}

impl ServerSpec {
    /// Whether the record describes a machine. Generated credentials alone
    /// do not count.
    pub fn declares_instance(&self) -> bool {
        self.ip.is_some()
            || self.ip_private.is_some()
            || self.instance_type.is_some()
            || self.slug.is_some()
            || self.id.is_some()
    }

    pub fn mysql_mut(&mut self) -> &mut MysqlCredentials {
        self.mysql.get_or_insert_with(MysqlCredentials::default)
    }

    pub fn mssql_mut(&mut self) -> &mut MssqlCredentials {
        self.mssql.get_or_insert_with(MssqlCredentials::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MysqlCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MssqlCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sa_password: Option<String>,
}

/// Per-environment software admin credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftwareDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drupal: Option<SoftwareAdmin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wordpress: Option<SoftwareAdmin>,
}

impl SoftwareDefaults {
    pub fn drupal_mut(&mut self) -> &mut SoftwareAdmin {
        self.drupal.get_or_insert_with(SoftwareAdmin::default)
    }

    pub fn wordpress_mut(&mut self) -> &mut SoftwareAdmin {
        self.wordpress.get_or_insert_with(SoftwareAdmin::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftwareAdmin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}
