use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;
use crate::errors::{LockboxError, Result};

/// How `VaultRegistry::list` orders vaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Oldest vault first.
    #[default]
    Created,
    /// Alphabetical by name.
    Name,
    /// Most recently opened first; never-opened vaults last.
    LastOpened,
}

/// Per-directory configuration, loaded from `<vaults_dir>/lockbox.toml`.
///
/// A missing file or missing key falls back to the built-in value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// File name of the registry index inside the vaults directory.
    #[serde(default = "default_registry_file")]
    pub registry_file: String,

    /// Argon2 memory cost in KiB for new keys (default: 64 MB).
    #[serde(default = "default_kdf_memory_kib")]
    pub kdf_memory_kib: u32,

    /// Argon2 iteration count for new keys (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2 parallelism degree for new keys (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,

    /// Order of `lockbox vaults` output.
    #[serde(default)]
    pub list_order: ListOrder,

    /// Length used by `lockbox generate` and `add --generate`.
    #[serde(default = "default_generator_length")]
    pub generator_length: usize,
}

// Field defaults, shared by serde and `Default`.

fn default_registry_file() -> String {
    "registry.json".to_string()
}

fn default_kdf_memory_kib() -> u32 {
    64 * 1024
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

fn default_generator_length() -> usize {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_file: default_registry_file(),
            kdf_memory_kib: default_kdf_memory_kib(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
            list_order: ListOrder::default(),
            generator_length: default_generator_length(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the vaults directory.
    pub const FILE_NAME: &'static str = "lockbox.toml";

    /// Load settings from `<vaults_dir>/lockbox.toml`.
    ///
    /// A missing file yields `Settings::default()`.
    /// If the file exists but cannot be parsed, or asks for KDF
    /// parameters below the safety floor, an error is returned.
    pub fn load(vaults_dir: &Path) -> Result<Self> {
        let config_path = vaults_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            LockboxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.kdf_params().check_floor().map_err(|e| {
            LockboxError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Full path of the registry index.
    pub fn registry_path(&self, vaults_dir: &Path) -> PathBuf {
        vaults_dir.join(&self.registry_file)
    }

    /// The KDF policy used when creating vaults or changing passwords.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.kdf_memory_kib,
            iterations: self.kdf_iterations,
            parallelism: self.kdf_parallelism,
        }
    }

    /// Settings with the KDF policy replaced (handy for tests).
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_memory_kib = params.memory_kib;
        self.kdf_iterations = params.iterations;
        self.kdf_parallelism = params.parallelism;
        self
    }
}
