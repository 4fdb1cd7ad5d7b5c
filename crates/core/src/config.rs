//! Client configuration
//!
//! Values are layered: built-in defaults, then an optional configuration file
//! (TOML or YAML, picked by extension), then `QUICKSURF_*` environment
//! variables.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default API root used when nothing else is configured
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "QUICKSURF";

/// Configuration for talking to the Quicksurf backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root of the backend API, e.g. `https://quicksurf.onrender.com/api`
    pub api_base: String,

    /// Whole-request timeout in seconds (0 disables it)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Directory holding persisted credentials
    pub state_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            user_agent: concat!("quicksurf-client/", env!("CARGO_PKG_VERSION")).to_string(),
            state_dir: default_state_dir(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from defaults and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable cannot be parsed or the
    /// resulting API root is not a valid http(s) URL
    pub fn from_env() -> CoreResult<Self> {
        Self::load(None, env_source())
    }

    /// Load configuration from a file, with environment variables on top
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        Self::load(Some(path.as_ref()), env_source())
    }

    fn load(file: Option<&Path>, env: config::Environment) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api_base", defaults.api_base)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("state_dir", defaults.state_dir.to_string_lossy().to_string())?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// API root with trailing slashes stripped
    pub fn api_root(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Check that the API root is an absolute http(s) URL
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] when it is not
    pub fn validate(&self) -> CoreResult<()> {
        let url = Url::parse(self.api_root()).map_err(|e| {
            CoreError::invalid_config(format!("api_base '{}': {e}", self.api_base))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(CoreError::invalid_config(format!(
                "api_base must use http or https, got '{other}'"
            ))),
        }
    }

    /// Path of the persisted (durable) credential store
    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir.join("credentials.json")
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

fn default_state_dir() -> PathBuf {
    directories::ProjectDirs::from("ng", "Quicksurf", "quicksurf")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".quicksurf"))
}
