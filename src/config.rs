//! Configuration for viewer-load, read from `viewer-load.toml`.
//!
//! [`LoaderConfig`] holds every tunable of a run. Keys missing from the file
//! fall back to defaults. `VIEWER_LOAD_BASE_URL` takes precedence over the file,
//! and command-line flags take precedence over both (see [`LoaderConfig::apply_cli`]).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::cli::Cli;
use crate::error::LoadError;

const CONFIG_FILE: &str = "viewer-load.toml";
const BASE_URL_ENV: &str = "VIEWER_LOAD_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Root of the workflow viewer; `/workflows` is resolved against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Outstanding queued jobs allowed before the controller starts trimming.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Sleep between trim cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://view.commonwl.org:8082/".to_string()
}

fn default_max_concurrent() -> usize {
    3
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    "cwlviewer-load/0.0.1".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_concurrent: default_max_concurrent(),
            poll_interval_ms: default_poll_interval_ms(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl LoaderConfig {
    /// Loads `viewer-load.toml` from the current directory, or defaults if absent.
    pub fn load() -> Result<Self, LoadError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, LoadError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<LoaderConfig>(&contents)
                .map_err(|e| LoadError::Config(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };

        if let Ok(base) = std::env::var(BASE_URL_ENV)
            && !base.is_empty()
        {
            config.base_url = base;
        }

        Ok(config)
    }

    /// Overlays the flags given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base) = &cli.base_url {
            self.base_url = base.clone();
        }
        if let Some(n) = cli.max_concurrent {
            self.max_concurrent = n;
        }
        if let Some(ms) = cli.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.max_concurrent == 0 {
            return Err(LoadError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, LoadError> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
