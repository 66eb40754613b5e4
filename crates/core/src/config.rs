use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Open one named video directly instead of showing the list
    pub single_mode: bool,
    pub single_name: Option<String>,
    pub subtitle_poll_attempts: u32,
    pub summary_poll_attempts: u32,
    pub poll_delay_ms: u64,
    pub suggestion_cap: usize,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            single_mode: false,
            single_name: None,
            subtitle_poll_attempts: 12,
            summary_poll_attempts: 6,
            poll_delay_ms: 5000,
            suggestion_cap: 6,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    List,
    Single(String),
}

impl AppConfig {
    /// `$XDG_CONFIG_HOME/lectern/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lectern").join("config.toml"))
    }

    /// Read settings from `path`, falling back to the default location.
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (Self::default_path(), false),
        };

        let mut builder = Config::builder();
        if let Some(path) = &path {
            debug!(path = %path.display(), required, "loading config file");
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn mode(&self) -> LaunchMode {
        match self.single_name.as_deref().map(str::trim) {
            Some(name) if self.single_mode && !name.is_empty() => {
                LaunchMode::Single(name.to_string())
            }
            _ => LaunchMode::List,
        }
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
