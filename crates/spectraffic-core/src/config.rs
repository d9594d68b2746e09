//! Project configuration for test-case generation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for generated sheets and test-case files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// RNG seed for reproducible output (entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Replacement label catalog (JSON `{label: [patterns]}`)
    #[serde(default)]
    pub label_catalog: Option<PathBuf>,

    /// Label data pools for `$key$` placeholders (JSON `{key: [values]}`)
    #[serde(default)]
    pub label_data: Option<PathBuf>,

    /// Environment name used for `config.*site_name*` host lookups
    #[serde(default)]
    pub test_env: Option<String>,

    /// Only rows tagged with this value (Robot_Tag column) are assembled
    #[serde(default)]
    pub test_tag: Option<String>,

    /// Fixed suffix for non-config hosts (timestamp per host when absent)
    #[serde(default)]
    pub host_suffix: Option<String>,

    /// Global `config.<key>` lookups
    #[serde(default)]
    pub environment: HashMap<String, String>,

    /// Per-environment `config.<key>` lookups, preferred for site names
    #[serde(default)]
    pub environments: HashMap<String, HashMap<String, String>>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Key → value capability used to expand `config.<key>` host cells.
pub trait EnvLookup {
    fn lookup(&self, key: &str) -> Option<String>;

    /// Lookup scoped to a named environment. Falls back to [`EnvLookup::lookup`].
    fn lookup_in(&self, env: &str, key: &str) -> Option<String> {
        let _ = env;
        self.lookup(key)
    }
}

impl EnvLookup for Config {
    fn lookup(&self, key: &str) -> Option<String> {
        self.environment.get(key).cloned()
    }

    fn lookup_in(&self, env: &str, key: &str) -> Option<String> {
        self.environments
            .get(env)
            .and_then(|vars| vars.get(key))
            .cloned()
            .or_else(|| self.lookup(key))
    }
}

impl EnvLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            seed: None,
            label_catalog: None,
            label_data: None,
            test_env: None,
            test_tag: None,
            host_suffix: None,
            environment: HashMap::new(),
            environments: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.spectraffic.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".spectraffic.toml", ".spectraffic.json", "spectraffic.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# spectraffic configuration

# Where sheets (*.rows.json) and test cases (*.testcases.json) are written
output_dir = "output"

# Fixed seed for reproducible generation (omit for fresh values every run)
# seed = 42

# Replace the built-in label catalog: {"label": ["regex", ...]}
# label_catalog = "labels.json"

# Value pools for $key$ placeholders: {"key": ["v1", "v2"]}
# label_data = "label_data.json"

# Rows are only assembled while the Robot_Tag column contains this tag
# test_tag = "smoke"

# Environment used for config.*site_name* hosts
# test_env = "staging"

# Suffix appended to literal hosts (a nanosecond timestamp when omitted)
# host_suffix = "run1"

# Values for Host cells written as config.<key>
[environment]
# site_name = "shop.example.com"

# [environments.staging]
# site_name = "shop.staging.example.com"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
