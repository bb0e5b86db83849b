use std::env;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const BACKEND_URL_ENV: &str = "TRIPNOTE_SUPABASE_URL";
pub const BACKEND_KEY_ENV: &str = "TRIPNOTE_SUPABASE_KEY";
pub const REDIRECT_URL_ENV: &str = "TRIPNOTE_REDIRECT_URL";
pub const DEFAULT_REDIRECT_URL: &str = "tripnote://auth/callback";

/// Application-specific configuration helpers.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    root: PathBuf,
}

impl ConfigLocator {
    /// Attempt to discover the persistent configuration directory, creating it if needed.
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("app", "tripnote", "tripnote")
            .ok_or(ConfigError::MissingProjectDirs)?;
        Self::from_root(dirs.config_dir().to_path_buf())
    }

    /// Use an explicit directory instead of the platform default.
    pub fn from_root(root: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&root).map_err(ConfigError::CreateDir)?;
        set_user_only_permissions(&root)?;
        Ok(Self { root })
    }

    /// Path to the persisted session for the given profile.
    pub fn session_file(&self, profile: &str) -> PathBuf {
        self.root.join(format!("session-{profile}.json"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn set_user_only_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o700);
        fs::set_permissions(path, permissions)?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

/// Location and publishable key of the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendEndpoint {
    base_url: Url,
    api_key: String,
}

impl BackendEndpoint {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Resolve a path such as `auth/v1/user` against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }
}

/// Backend connection settings.
///
/// A config without an endpoint is valid: every request made through it fails
/// with [`ConfigError::BackendUnconfigured`] instead of aborting startup.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    endpoint: Option<BackendEndpoint>,
    redirect_url: Url,
}

impl BackendConfig {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: Some(BackendEndpoint {
                base_url: with_trailing_slash(base_url),
                api_key: api_key.into(),
            }),
            redirect_url: default_redirect_url(),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            endpoint: None,
            redirect_url: default_redirect_url(),
        }
    }

    /// Read settings from the process environment (and `.env`, when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_values(
            non_empty_var(BACKEND_URL_ENV),
            non_empty_var(BACKEND_KEY_ENV),
            non_empty_var(REDIRECT_URL_ENV),
        )
    }

    /// Build from raw setting values. A missing or unparseable endpoint yields an
    /// unconfigured backend; an unparseable redirect keeps the default one.
    pub fn from_values(url: Option<String>, key: Option<String>, redirect: Option<String>) -> Self {
        let mut config = match (url, key) {
            (Some(url), Some(key)) => match Url::parse(&url) {
                Ok(base_url) => {
                    debug!(url = %base_url, "backend endpoint configured");
                    Self::new(base_url, key)
                }
                Err(err) => {
                    warn!(error = %err, "{BACKEND_URL_ENV} is not a valid URL; backend calls will fail");
                    Self::unconfigured()
                }
            },
            _ => {
                warn!(
                    "backend credentials are not configured; set {BACKEND_URL_ENV} and {BACKEND_KEY_ENV}"
                );
                Self::unconfigured()
            }
        };

        if let Some(redirect) = redirect {
            match Url::parse(&redirect) {
                Ok(redirect) => config = config.with_redirect_url(redirect),
                Err(err) => {
                    warn!(error = %err, "{REDIRECT_URL_ENV} is not a valid URL; using {DEFAULT_REDIRECT_URL}")
                }
            }
        }

        config
    }

    pub fn with_redirect_url(mut self, redirect_url: Url) -> Self {
        self.redirect_url = redirect_url;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn endpoint(&self) -> Result<&BackendEndpoint, ConfigError> {
        self.endpoint.as_ref().ok_or(ConfigError::BackendUnconfigured)
    }

    /// Custom-scheme URL the identity provider sends the user back to.
    pub fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }
}

fn default_redirect_url() -> Url {
    Url::parse(DEFAULT_REDIRECT_URL).expect("valid default redirect URL")
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Errors that can occur when working with configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to determine configuration directory for tripnote")]
    MissingProjectDirs,
    #[error("failed to create configuration directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("filesystem error: {0}")]
    Io(#[source] std::io::Error),
    #[error("backend is not configured; cannot reach the server")]
    BackendUnconfigured,
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}
