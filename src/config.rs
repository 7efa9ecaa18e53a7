//! Drive root resolution and the derived directory layout.
//!
//! All persistent playground state (models, artifacts, manifests, flows,
//! the queue store) nests under a single "Drive" root directory. The root
//! is resolved from an explicit config file, the `EASEL_CONFIG` /
//! `DRIVE_ROOT` environment variables, or a fixed default, in that order.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// File name of the persisted configuration inside `config_dir`.
pub const DEFAULT_CONFIG_NAME: &str = "config.yaml";

/// Environment variable selecting the Drive root directory.
pub const ENV_DRIVE_ROOT: &str = "DRIVE_ROOT";

/// Environment variable pointing at an explicit config file.
pub const ENV_CONFIG_PATH: &str = "EASEL_CONFIG";

/// Fallback root when neither a config file nor `DRIVE_ROOT` is present.
const DEFAULT_DRIVE_ROOT: &str = "/content/drive/MyDrive/ComfyUI";

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure while reading/writing config or creating the layout.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but is not valid YAML.
    #[error("invalid config file {path}: {source}")]
    Yaml {
        /// The offending file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// On-disk shape of the YAML config. Unknown keys are ignored.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    drive_root: Option<String>,
    tunnel_preference: Option<String>,
    env_vars: Option<BTreeMap<String, String>>,
}

/// Runtime configuration anchored at the Drive root.
///
/// Derived paths are computed accessors so the struct stays cheap to clone
/// and cannot drift out of sync with the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    /// Base directory for all persistent playground state.
    pub drive_root: PathBuf,
    /// Preferred tunnel provider for exposing a local UI.
    pub tunnel_preference: String,
    /// Environment variable overrides applied on top of the process env.
    pub env_vars: BTreeMap<String, String>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DriveConfig {
    /// Creates a configuration rooted at the given directory.
    #[must_use]
    pub fn new(drive_root: impl Into<PathBuf>) -> Self {
        Self {
            drive_root: drive_root.into(),
            tunnel_preference: "cloudflared".to_string(),
            env_vars: BTreeMap::new(),
        }
    }

    /// Creates a configuration from `DRIVE_ROOT`, falling back to the default root.
    #[must_use]
    pub fn from_env() -> Self {
        let root = env::var(ENV_DRIVE_ROOT).unwrap_or_else(|_| DEFAULT_DRIVE_ROOT.to_string());
        Self::new(root)
    }

    /// Loads configuration with the standard resolution order.
    ///
    /// Priority:
    /// 1. `EASEL_CONFIG` env var pointing at an existing YAML file
    /// 2. `config/config.yaml` under the env-resolved root
    /// 3. The env-resolved root itself (layout created on first use)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an existing config file cannot be read
    /// or parsed, or when the directory layout cannot be created.
    #[instrument]
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(explicit) = env::var(ENV_CONFIG_PATH) {
            let candidate = PathBuf::from(explicit);
            if candidate.exists() {
                return Self::from_yaml(&candidate);
            }
        }

        let fallback = Self::from_env();
        let yaml_path = fallback.yaml_path();
        if yaml_path.exists() {
            return Self::from_yaml(&yaml_path);
        }

        fallback.ensure_directories()?;
        Ok(fallback)
    }

    /// Reads configuration from a YAML file and creates the directory layout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Yaml`] when it does not parse.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let file: ConfigFile = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = match file.drive_root {
            Some(root) => Self::new(root),
            None => Self::from_env(),
        };
        if let Some(tunnel) = file.tunnel_preference {
            config.tunnel_preference = tunnel;
        }
        if let Some(env_vars) = file.env_vars {
            config.env_vars = env_vars;
        }
        config.ensure_directories()?;
        Ok(config)
    }

    /// Persists `{drive_root, tunnel_preference, env_vars}` as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the layout cannot be created or the
    /// file cannot be written. Serialization of this fixed shape only
    /// fails on I/O.
    #[instrument(skip(self), fields(path = %self.yaml_path().display()))]
    pub fn save(&self) -> Result<(), ConfigError> {
        self.ensure_directories()?;
        let file = ConfigFile {
            drive_root: Some(self.drive_root.display().to_string()),
            tunnel_preference: Some(self.tunnel_preference.clone()),
            env_vars: Some(self.env_vars.clone()),
        };
        let path = self.yaml_path();
        let rendered = serde_yaml::to_string(&file).map_err(|source| ConfigError::Yaml {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, rendered).map_err(|e| ConfigError::io(path, e))
    }

    /// Creates the full Drive directory layout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let state_dir = self
            .queue_db_path()
            .parent()
            .map_or_else(|| self.drive_root.clone(), Path::to_path_buf);
        for dir in [
            self.drive_root.clone(),
            self.models_dir(),
            self.loras_dir(),
            self.gguf_dir(),
            self.artifacts_dir(),
            self.config_dir(),
            self.manifests_dir(),
            self.flows_dir(),
            state_dir,
        ] {
            fs::create_dir_all(&dir).map_err(|e| ConfigError::io(dir.clone(), e))?;
        }
        debug!(root = %self.drive_root.display(), "drive layout ensured");
        Ok(())
    }

    /// Base directory for model checkpoints.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.drive_root.join("models")
    }

    /// Directory for LoRA weights.
    #[must_use]
    pub fn loras_dir(&self) -> PathBuf {
        self.models_dir().join("loras")
    }

    /// Directory for GGUF quantized models.
    #[must_use]
    pub fn gguf_dir(&self) -> PathBuf {
        self.models_dir().join("gguf")
    }

    /// Directory for generated artifacts.
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.drive_root.join("artifacts")
    }

    /// Directory for configuration files.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.drive_root.join("config")
    }

    /// Directory for download manifests.
    #[must_use]
    pub fn manifests_dir(&self) -> PathBuf {
        self.drive_root.join("manifests")
    }

    /// Directory for composed flow documents.
    #[must_use]
    pub fn flows_dir(&self) -> PathBuf {
        self.drive_root.join("flows")
    }

    /// Path of the SQLite job store.
    #[must_use]
    pub fn queue_db_path(&self) -> PathBuf {
        self.drive_root.join("state").join("queue.sqlite3")
    }

    /// Path of the prompt templates file.
    #[must_use]
    pub fn templates_path(&self) -> PathBuf {
        self.config_dir().join("prompt_templates.json")
    }

    /// Path of the persisted YAML config.
    #[must_use]
    pub fn yaml_path(&self) -> PathBuf {
        self.config_dir().join(DEFAULT_CONFIG_NAME)
    }

    /// Returns the process environment merged with `env_vars` overrides.
    #[must_use]
    pub fn resolve_env(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = env::vars().collect();
        for (key, value) in &self.env_vars {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}
