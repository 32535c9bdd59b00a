use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

fn default_video_bucket() -> String {
    "videos".to_string()
}

fn default_thumbnail_bucket() -> String {
    "thumbnails".to_string()
}

fn default_timeout_secs() -> u64 {
    // 5 minutes
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Object-storage endpoint, e.g. "https://storage.example.com/v1"
    pub endpoint: String,
    /// Bearer token for the storage endpoint, if it wants one
    pub token: Option<String>,
    #[serde(default = "default_video_bucket")]
    pub video_bucket: String,
    #[serde(default = "default_thumbnail_bucket")]
    pub thumbnail_bucket: String,
    /// Queue snapshot location; no persistence across restarts when unset
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;

        Ok(config)
    }
}
