//! Configuration file handling for textpeel.
//!
//! TOML layout:
//!
//! ```toml
//! [decomposers]
//! names = ["*"]
//!
//! [decomposers.options.http-server]
//! url = "http://127.0.0.1:8080/extraction"
//!
//! [limits]
//! timeout = "30s"
//! max-body-size = "10MB"
//!
//! [mime-types]
//! pdf = "application/pdf"
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use textpeel_decompose::Options;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Decomposer activation and options
    #[serde(default)]
    pub decomposers: DecomposersConfig,

    /// Resource limits applied to the root input
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Extra extension-to-MIME mappings
    #[serde(default, rename = "mime-types")]
    pub mime_types: HashMap<String, String>,
}

/// Which decomposers run and how they are configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposersConfig {
    /// Glob patterns over decomposer names
    #[serde(default = "default_names")]
    pub names: Vec<String>,

    /// Per-decomposer options, keyed by decomposer name
    #[serde(default)]
    pub options: HashMap<String, Options>,
}

fn default_names() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for DecomposersConfig {
    fn default() -> Self {
        Self {
            names: default_names(),
            options: HashMap::new(),
        }
    }
}

/// Resource limits, in the human-readable forms the CLI accepts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LimitsConfig {
    /// Extraction time budget, e.g. `"30s"`, `"5m"`
    #[serde(default)]
    pub timeout: Option<String>,

    /// Text body size bound, e.g. `"10MB"`
    #[serde(default, rename = "max-body-size")]
    pub max_body_size: Option<String>,
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("cannot parse config file: {}", path.display()))
    }
}
