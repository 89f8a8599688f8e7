use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_content_dir() -> PathBuf {
    PathBuf::from(".survey/content")
}

fn default_access_dir() -> PathBuf {
    PathBuf::from(".survey/access")
}

fn default_request_validity() -> u64 {
    300
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_access_dir")]
    pub access_dir: PathBuf,
    /// Seconds a signed decryption request stays valid.
    #[serde(default = "default_request_validity")]
    pub request_validity_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            access_dir: default_access_dir(),
            request_validity_secs: default_request_validity(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
