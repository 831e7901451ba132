//! Website repository probing.
//!
//! Validation decides what a healthy website repository looks like; a
//! `RepositoryHost` only reports what the code host says about it.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::core::domain::{Company, ProviderName};
use crate::core::http::{self, Reply};
use crate::error::Result;

/// Code hosts a website repository may live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Github,
    Bitbucket,
}

/// A parsed repository URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// `git` for `git@host:owner/name`, the scheme otherwise.
    pub user_or_scheme: String,
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `git@host:owner/name(.git)` or `scheme://host/owner/name(.git)`.
    pub fn parse(uri: &str) -> Option<Self> {
        let (user_or_scheme, host, path) = if let Some((scheme, rest)) = uri.split_once("://") {
            let (host, path) = rest.split_once('/')?;
            (scheme, host, path)
        } else {
            let (user, rest) = uri.split_once('@')?;
            let (host, path) = rest.split_once(':')?;
            (user, host, path)
        };

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, name) = path.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }

        Some(Self {
            user_or_scheme: user_or_scheme.to_string(),
            host: host.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn is_ssh(&self) -> bool {
        self.user_or_scheme == "git"
    }

    pub fn host_kind(&self) -> Option<HostKind> {
        match self.host.as_str() {
            "github.com" => Some(HostKind::Github),
            "bitbucket.org" => Some(HostKind::Bitbucket),
            _ => None,
        }
    }

    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// What the code host reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoFacts {
    pub exists: bool,
    pub writable: bool,
    pub empty: bool,
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(RepoFacts),
    Unavailable(String),
}

/// Capability to inspect a website repository.
pub trait RepositoryHost {
    /// # Errors
    ///
    /// Returns `ProviderError::Auth` when the host rejects the credentials.
    fn probe(&self, repo: &RepoRef) -> Result<Probe>;
}

struct Login {
    username: String,
    password: String,
}

/// GitHub v3 and Bitbucket 2.0 over HTTPS.
pub struct HttpRepositoryHost {
    client: Client,
    github: Option<Login>,
    bitbucket: Option<Login>,
    github_api: String,
    bitbucket_api: String,
}

#[derive(Deserialize)]
struct GithubBranch {
    name: String,
}

#[derive(Deserialize)]
struct BitbucketPage<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
}

#[derive(Deserialize)]
struct BitbucketBranch {
    name: String,
}

#[derive(Deserialize)]
struct BitbucketPermission {
    permission: String,
}

macro_rules! reply {
    ($e:expr) => {
        match $e? {
            Reply::Ok(response) => response,
            Reply::Unavailable(reason) => return Ok(Probe::Unavailable(reason)),
        }
    };
}

macro_rules! decode {
    ($provider:expr, $response:expr) => {
        match http::json($provider, $response) {
            Ok(value) => value,
            Err(reason) => return Ok(Probe::Unavailable(reason)),
        }
    };
}

impl HttpRepositoryHost {
    pub fn new(company: &Company, timeout: Duration) -> Result<Self> {
        let login = |provider| {
            let credentials = &company.credentials;
            Some(Login {
                username: credentials.field(provider, "username")?.to_string(),
                password: credentials.field(provider, "password")?.to_string(),
            })
        };

        Ok(Self {
            client: http::client(timeout)?,
            github: login(ProviderName::Github),
            bitbucket: login(ProviderName::Bitbucket),
            github_api: "https://api.github.com".to_string(),
            bitbucket_api: "https://api.bitbucket.org/2.0".to_string(),
        })
    }

    /// Point at alternative API roots.
    pub fn with_endpoints(mut self, github: impl Into<String>, bitbucket: impl Into<String>) -> Self {
        self.github_api = github.into();
        self.bitbucket_api = bitbucket.into();
        self
    }

    fn get(&self, url: String, login: &Login) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&login.username, Some(&login.password))
    }

    fn probe_github(&self, repo: &RepoRef, login: &Login) -> Result<Probe> {
        let base = format!("{}/repos/{}", self.github_api, repo.full_name());

        let response = reply!(http::send("github", self.get(base.clone(), login), &[404]));
        if response.status().as_u16() == 404 {
            return Ok(Probe::Found(RepoFacts::default()));
        }

        let url = format!("{}/collaborators/{}", base, login.username);
        let response = reply!(http::send("github", self.get(url, login), &[403, 404]));
        let writable = response.status().as_u16() == 204;

        let url = format!("{}/contributors", base);
        let response = reply!(http::send("github", self.get(url, login), &[]));
        let empty = response.status().as_u16() == 204;

        let url = format!("{}/branches?per_page=100", base);
        let response = reply!(http::send("github", self.get(url, login), &[]));
        let branches: Vec<GithubBranch> = decode!("github", response);

        Ok(Probe::Found(RepoFacts {
            exists: true,
            writable,
            empty,
            branches: branches.into_iter().map(|b| b.name).collect(),
        }))
    }

    fn probe_bitbucket(&self, repo: &RepoRef, login: &Login) -> Result<Probe> {
        let full = repo.full_name();
        let base = format!("{}/repositories/{}", self.bitbucket_api, full);

        let response = reply!(http::send("bitbucket", self.get(base.clone(), login), &[404]));
        if response.status().as_u16() == 404 {
            return Ok(Probe::Found(RepoFacts::default()));
        }

        let url = format!(
            "{}/user/permissions/repositories?q=repository.full_name=\"{}\"",
            self.bitbucket_api, full
        );
        let response = reply!(http::send("bitbucket", self.get(url, login), &[]));
        let permissions: BitbucketPage<BitbucketPermission> = decode!("bitbucket", response);
        let writable = permissions
            .values
            .iter()
            .any(|p| p.permission == "admin" || p.permission == "write");

        let url = format!("{}/commits?pagelen=1", base);
        let response = reply!(http::send("bitbucket", self.get(url, login), &[]));
        let commits: BitbucketPage<serde_json::Value> = decode!("bitbucket", response);

        let url = format!("{}/refs/branches?pagelen=100", base);
        let response = reply!(http::send("bitbucket", self.get(url, login), &[]));
        let branches: BitbucketPage<BitbucketBranch> = decode!("bitbucket", response);

        Ok(Probe::Found(RepoFacts {
            exists: true,
            writable,
            empty: commits.values.is_empty(),
            branches: branches.values.into_iter().map(|b| b.name).collect(),
        }))
    }
}

impl RepositoryHost for HttpRepositoryHost {
    fn probe(&self, repo: &RepoRef) -> Result<Probe> {
        debug!(repo = %repo.full_name(), host = %repo.host, "probing repository");

        let (kind, login) = match repo.host_kind() {
            Some(HostKind::Github) => (HostKind::Github, self.github.as_ref()),
            Some(HostKind::Bitbucket) => (HostKind::Bitbucket, self.bitbucket.as_ref()),
            None => return Ok(Probe::Unavailable(format!("unsupported host {}", repo.host))),
        };
        let Some(login) = login else {
            return Ok(Probe::Unavailable(format!("no {} credentials", repo.host)));
        };

        match kind {
            HostKind::Github => self.probe_github(repo, login),
            HostKind::Bitbucket => self.probe_bitbucket(repo, login),
        }
    }
}
