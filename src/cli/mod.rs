//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::keyfile::{combine_password_keyfile, load_keyfile};
use crate::crypto::password::DEFAULT_LENGTH;
use crate::crypto::MasterKey;
use crate::errors::{GuardianError, Result};
use crate::vault::{open_backing_file, storage, Vault, VaultOptions};

/// Environment variable consulted for the master key before prompting.
pub const MASTER_KEY_ENV: &str = "GUARDIAN_MASTER_KEY";

/// Environment variable consulted for the replacement key in `rotate-key`.
pub const NEW_MASTER_KEY_ENV: &str = "GUARDIAN_NEW_MASTER_KEY";

/// Guardian CLI: encrypted secret vault, mountable as a filesystem.
#[derive(Parser)]
#[command(
    name = "guardian",
    about = "Encrypted secret vault, mountable as a filesystem",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: $HOME/guardian.json)
    #[arg(long, global = true, env = "GUARDIAN_SECRETS")]
    pub secrets: Option<PathBuf>,

    /// Config file (default: $GUARDIAN_CONFIG or ~/.config/guardian/guardian.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Size in bytes of the random salts written on save
    #[arg(long, global = true)]
    pub salt_size: Option<usize>,

    /// Argon2 passes
    #[arg(long, global = true)]
    pub argon_time: Option<u32>,

    /// Argon2 memory in KiB
    #[arg(long, global = true)]
    pub argon_memory: Option<u32>,

    /// Argon2 lanes
    #[arg(long, global = true)]
    pub argon_threads: Option<u8>,

    /// Read the master key as one line from stdin instead of prompting
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Path to a keyfile for two-factor vault access
    #[arg(long, global = true)]
    pub keyfile: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Write a new, empty vault file
    Init {
        /// Replace a vault file that already holds data
        #[arg(long)]
        force: bool,
    },

    /// Print the value stored under an id
    Get {
        /// Entry id (e.g. github.com)
        id: String,
    },

    /// Add or update an entry
    Set {
        /// Entry id
        id: String,
        /// Value (omit to read piped stdin or prompt)
        value: Option<String>,
    },

    /// Delete an entry
    #[command(alias = "delete")]
    Del {
        /// Entry id
        id: String,
    },

    /// List all entry ids
    List {
        /// One id per line, no table
        #[arg(long)]
        plain: bool,
    },

    /// Serve the vault as a directory until it is unmounted
    Mount {
        /// Existing empty directory to mount on
        mount_point: PathBuf,
    },

    /// Generate a random printable password
    Password {
        /// Number of characters
        #[arg(short, long, default_value_t = DEFAULT_LENGTH)]
        length: usize,
        /// Print the password base64 encoded
        #[arg(long, conflicts_with = "hex")]
        base64: bool,
        /// Print the password hex encoded
        #[arg(long)]
        hex: bool,
    },

    /// Re-encrypt the vault under a new master key
    RotateKey,

    /// Generate a new random keyfile
    Keyfile {
        /// Where to write the keyfile
        path: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings from the config file with command-line overrides applied.
pub fn settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::resolve(cli.config.as_deref())?;

    if let Some(path) = &cli.secrets {
        settings.secrets = path.clone();
    }
    if let Some(salt_size) = cli.salt_size {
        settings.salt_size = salt_size;
    }
    if let Some(time) = cli.argon_time {
        settings.argon_time = time;
    }
    if let Some(memory) = cli.argon_memory {
        settings.argon_memory_kib = memory;
    }
    if let Some(threads) = cli.argon_threads {
        settings.argon_threads = threads;
    }

    Ok(settings)
}

/// Get the master key, trying in order:
/// 1. `GUARDIAN_MASTER_KEY` env var (scripts/CI)
/// 2. One line of stdin when `--no-prompt` is set
/// 3. Interactive hidden prompt
///
/// The key is combined with `--keyfile` when one is given.
pub fn read_master_key(cli: &Cli) -> Result<MasterKey> {
    let password = acquire_secret(MASTER_KEY_ENV, cli.no_prompt, || {
        dialoguer::Password::new()
            .with_prompt("Master key")
            .interact()
    })?;
    finish_key(cli, &password)
}

/// Get a replacement master key (used by `rotate-key`).
///
/// Same sources as [`read_master_key`] but reads `GUARDIAN_NEW_MASTER_KEY`
/// and asks for confirmation when prompting.
pub fn read_new_master_key(cli: &Cli) -> Result<MasterKey> {
    let password = acquire_secret(NEW_MASTER_KEY_ENV, cli.no_prompt, || {
        dialoguer::Password::new()
            .with_prompt("New master key")
            .with_confirmation("Confirm new master key", "Keys do not match, try again")
            .interact()
    })?;
    finish_key(cli, &password)
}

fn acquire_secret(
    env_var: &str,
    no_prompt: bool,
    prompt: impl FnOnce() -> dialoguer::Result<String>,
) -> Result<Zeroizing<String>> {
    // 1. Check the environment variable first.
    if let Ok(key) = std::env::var(env_var) {
        if !key.is_empty() {
            debug!(source = env_var, "master key taken from environment");
            return Ok(Zeroizing::new(key));
        }
    }

    // 2. A single line on stdin.
    if no_prompt {
        return read_key_line(&mut io::stdin().lock());
    }

    // 3. Fall back to the interactive prompt.
    let key =
        prompt().map_err(|e| GuardianError::CommandFailed(format!("master key prompt: {e}")))?;
    Ok(Zeroizing::new(key))
}

/// Read one line, without its line terminator.
pub fn read_key_line(reader: &mut impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader
        .read_line(&mut line)
        .map_err(|e| GuardianError::io("failed to read master key from stdin", e))?;

    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

fn finish_key(cli: &Cli, password: &str) -> Result<MasterKey> {
    if password.is_empty() {
        return Err(GuardianError::CommandFailed(
            "master key must not be empty".into(),
        ));
    }

    match &cli.keyfile {
        Some(path) => {
            let keyfile = load_keyfile(path)?;
            combine_password_keyfile(password.as_bytes(), keyfile.as_bytes())
        }
        None => Ok(MasterKey::from_slice(password.as_bytes())),
    }
}

/// An opened vault, the file it lives in and the key that opened it.
///
/// The file handle stays open for the whole command so every save goes
/// back through it.
pub struct Session {
    pub path: PathBuf,
    pub vault: Vault,
    pub file: File,
    pub key: MasterKey,
}

impl Session {
    /// Resolve settings, read the master key and load the vault.
    pub fn open(cli: &Cli) -> Result<Self> {
        let settings = settings(cli)?;
        let key = read_master_key(cli)?;
        Self::open_with(&settings.secrets, settings.vault_options(), key)
    }

    pub fn open_with(path: &Path, options: VaultOptions, key: MasterKey) -> Result<Self> {
        let mut file = open_backing_file(path)?;
        let vault = storage::load(&mut file, key.as_bytes(), options)?;

        Ok(Self {
            path: path.to_path_buf(),
            vault,
            file,
            key,
        })
    }

    /// Persist the vault, replacing whatever the file held.
    pub fn save(&mut self) -> Result<()> {
        storage::overwrite(&self.vault, self.key.as_bytes(), &mut self.file)
    }
}
