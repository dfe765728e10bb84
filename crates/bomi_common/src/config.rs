//! Configuration loading.
//!
//! One `BomiConfig` per process, loaded by the binary and passed explicitly
//! into constructors. Tests build literals instead of touching the
//! filesystem. `BOMI_BACKEND_URL` overrides the configured base URL so a
//! local backend can be pointed at without editing the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BomiError;

pub const DEFAULT_CONFIG_FILE: &str = "bomi.toml";
pub const BACKEND_URL_ENV: &str = "BOMI_BACKEND_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BomiConfig {
    pub backend: BackendConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Upper bound for coverage-candidate searches (choice lists cap at 8).
    pub max_candidates: u8,
    /// Default row count for premium rankings.
    pub top_n: u8,
    /// Optional pricing snapshot date (YYYY-MM-DD) forwarded to the backend.
    pub as_of_date: Option<String>,
}

impl Default for BomiConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_candidates: 8,
            top_n: 4,
            as_of_date: None,
        }
    }
}

impl BomiConfig {
    /// Load from a TOML file, falling back to defaults when the file does
    /// not exist. A present-but-unparsable file is a config error, not a
    /// silent default.
    pub fn load(path: &Path) -> Result<Self, BomiError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw).map_err(|e| BomiError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend.base_url = url.trim().to_string();
            }
        }
        Ok(config)
    }
}
