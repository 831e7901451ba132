//! Per-environment credential generation.
//!
//! Any server or software credential that is absent or empty is filled once.
//! `dev` gets well-known defaults so local machines are reproducible; every
//! other environment gets 16 random bytes, URL-safe base64.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::core::domain::{EnvName, Environment, ServerRole};

/// A generated secret, `SecureRandom.urlsafe_base64(16)` compatible.
pub fn random_secret() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn fill(slot: &mut Option<String>, value: impl FnOnce() -> String) -> bool {
    if slot.as_deref().is_some_and(|v| !v.is_empty()) {
        return false;
    }
    *slot = Some(value());
    true
}

/// Fill missing credentials with `random_secret`.
///
/// Returns the number of fields written.
pub fn fill_credentials(env: EnvName, environment: &mut Environment) -> usize {
    fill_credentials_with(env, environment, &mut random_secret)
}

/// Fill missing credentials, drawing non-dev values from `secret`.
pub fn fill_credentials_with(
    env: EnvName,
    environment: &mut Environment,
    secret: &mut dyn FnMut() -> String,
) -> usize {
    let dev = env == EnvName::Dev;
    let mut pick = |default: &str| {
        if dev {
            default.to_string()
        } else {
            secret()
        }
    };
    let mut filled = 0;
    let mut count = |written: bool| filled += usize::from(written);

    let servers = &mut environment.servers;

    count(fill(&mut servers.ensure(ServerRole::Windows).admin_password, || {
        pick("vagrant")
    }));

    let mssql_server = servers.ensure(ServerRole::WindowsMssql);
    count(fill(&mut mssql_server.admin_password, || pick("vagrant")));
    let mssql = mssql_server.mssql_mut();
    count(fill(&mut mssql.user, || env.as_str().to_string()));
    count(fill(&mut mssql.user_password, || pick("password")));
    count(fill(&mut mssql.sa_password, || pick("drowssap")));

    let mysql = servers.ensure(ServerRole::RedhatMysql).mysql_mut();
    count(fill(&mut mysql.user_password, || pick("password")));
    count(fill(&mut mysql.root_password, || pick("password")));

    let software = &mut environment.software;
    count(fill(&mut software.admin_password, || pick("password")));
    count(fill(&mut software.drupal_mut().admin_password, || {
        pick("password")
    }));
    count(fill(&mut software.wordpress_mut().admin_password, || {
        pick("password")
    }));

    if filled > 0 {
        debug!(env = %env, filled, "generated credentials");
    }
    filled
}
