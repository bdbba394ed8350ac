use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Guardian.
#[derive(Debug, Error)]
pub enum GuardianError {
    // --- Crypto errors ---
    /// Wrong master key, tampered envelope or truncated ciphertext.
    /// Callers cannot tell which.
    #[error("failed to decrypt — wrong master key or corrupted vault")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // --- Vault errors ---
    #[error("Vault payload is corrupt: {0}")]
    CorruptPayload(String),

    #[error("Invalid vault format: {0}")]
    InvalidFormat(String),

    #[error("No entry found with id '{0}'")]
    NotFound(String),

    #[error("Vault file {0} already holds data (use --force to overwrite)")]
    VaultAlreadyExists(PathBuf),

    // --- Keyfile errors ---
    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("{context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Mount errors ---
    #[error("Mount failed: {0}")]
    MountFailed(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl GuardianError {
    /// Wrap an IO error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoFailure {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Guardian results.
pub type Result<T> = std::result::Result<T, GuardianError>;
