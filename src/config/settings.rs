use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::CostParams;
use crate::errors::{GuardianError, Result};
use crate::vault::{VaultOptions, DEFAULT_SALT_SIZE};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GUARDIAN_CONFIG";

/// User-level configuration, loaded from `guardian.toml`.
///
/// Every field has a default so Guardian works without any config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the vault file (default: `$HOME/guardian.json`).
    #[serde(default = "default_secrets")]
    pub secrets: PathBuf,

    /// Size of each envelope salt in bytes (default: 64).
    #[serde(default = "default_salt_size")]
    pub salt_size: usize,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon_time")]
    pub argon_time: u32,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon_memory_kib")]
    pub argon_memory_kib: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon_threads")]
    pub argon_threads: u8,
}

// ── Serde default helpers ────────────────────────────────────────────

fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_secrets() -> PathBuf {
    home_dir().join("guardian.json")
}

fn default_salt_size() -> usize {
    DEFAULT_SALT_SIZE
}

fn default_argon_time() -> u32 {
    CostParams::default().time
}

fn default_argon_memory_kib() -> u32 {
    CostParams::default().memory_kib
}

fn default_argon_threads() -> u8 {
    CostParams::default().parallelism
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            secrets: default_secrets(),
            salt_size: default_salt_size(),
            argon_time: default_argon_time(),
            argon_memory_kib: default_argon_memory_kib(),
            argon_threads: default_argon_threads(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the config directory.
    const FILE_NAME: &'static str = "guardian.toml";

    /// Where settings are read from when no path is given explicitly:
    /// `$GUARDIAN_CONFIG`, then `$HOME/.config/guardian/guardian.toml`.
    pub fn default_path() -> PathBuf {
        match env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => home_dir()
                .join(".config")
                .join("guardian")
                .join(Self::FILE_NAME),
        }
    }

    /// Load settings from `explicit`, or from [`Settings::default_path`].
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load(&Self::default_path()),
        }
    }

    /// Load settings from `path`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GuardianError::io(format!("failed to read {}", path.display()), e))?;

        toml::from_str(&contents).map_err(|e| {
            GuardianError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn cost(&self) -> CostParams {
        CostParams::new(self.argon_time, self.argon_memory_kib, self.argon_threads)
    }

    /// The options a vault opened under these settings is bound to.
    pub fn vault_options(&self) -> VaultOptions {
        VaultOptions::new(self.cost(), self.salt_size)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
