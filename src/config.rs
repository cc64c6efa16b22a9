use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub(crate) const APP_ID_VAR: &str = "SAILPLAN_APP_ID";
pub(crate) const BACKEND_CONFIG_VAR: &str = "SAILPLAN_BACKEND_CONFIG";
pub(crate) const AUTH_TOKEN_VAR: &str = "SAILPLAN_AUTH_TOKEN";
pub(crate) const PASSCODE_VAR: &str = "SAILPLAN_PASSCODE";
pub(crate) const LOG_FILE_VAR: &str = "SAILPLAN_LOG_FILE";

static DEFAULT_APP_ID: &str = "default-app-id";

static DEFAULT_PROJECT_ID: &str = "local";

/// Passcode used when none is configured
static DEFAULT_PASSCODE: &str = "anchorsaweigh";

/// Connection settings for the document store, supplied as a JSON object
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackendConfig {
    pub(crate) project_id: String,
    #[serde(default)]
    pub(crate) api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> BackendConfig {
        BackendConfig {
            project_id: String::from(DEFAULT_PROJECT_ID),
            api_key: None,
        }
    }
}

#[derive(Clone, Eq, PartialEq)]
pub(crate) struct Config {
    pub(crate) app_id: String,
    pub(crate) backend: BackendConfig,
    pub(crate) auth_token: Option<String>,
    pub(crate) passcode: String,
    pub(crate) log_file: Option<PathBuf>,
}

impl Config {
    pub(crate) fn from_env() -> Result<Config, ConfigError> {
        Config::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup.  Blank values count as
    /// unset.
    pub(crate) fn from_vars<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let backend = match var(BACKEND_CONFIG_VAR) {
            Some(raw) => serde_json::from_str(&raw).map_err(ConfigError::Backend)?,
            None => BackendConfig::default(),
        };
        Ok(Config {
            app_id: var(APP_ID_VAR).unwrap_or_else(|| String::from(DEFAULT_APP_ID)),
            backend,
            auth_token: var(AUTH_TOKEN_VAR),
            passcode: var(PASSCODE_VAR).unwrap_or_else(|| String::from(DEFAULT_PASSCODE)),
            log_file: var(LOG_FILE_VAR).map(PathBuf::from),
        })
    }
}

// Keep the passcode and credentials out of debug output
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field("project_id", &self.backend.project_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("log_file", &self.log_file)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid SAILPLAN_BACKEND_CONFIG")]
    Backend(#[source] serde_json::Error),
}
