//! `guardian init` — write a new, empty, encrypted vault file.

use std::fs;

use crate::cli::output;
use crate::cli::{read_master_key, settings, Cli};
use crate::errors::{GuardianError, Result};
use crate::vault::{open_backing_file, storage, Vault};

/// Execute the `init` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let settings = settings(cli)?;
    let path = &settings.secrets;

    // 1. Refuse to clobber a vault that already holds data.
    let has_data = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if has_data && !force {
        output::tip("Use `guardian set` to add entries to the existing vault.");
        return Err(GuardianError::VaultAlreadyExists(path.clone()));
    }

    // 2. Create the parent directory if needed.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                GuardianError::io(format!("failed to create {}", parent.display()), e)
            })?;
            output::info(&format!("Created directory: {}", parent.display()));
        }
    }

    // 3. Seal an empty vault under the master key.
    let key = read_master_key(cli)?;
    let vault = Vault::with_options(settings.vault_options());
    let mut file = open_backing_file(path)?;
    storage::overwrite(&vault, key.as_bytes(), &mut file)?;

    output::success(&format!("Vault initialized at {}", path.display()));
    if cli.keyfile.is_some() {
        output::info("Vault sealed with a keyfile — pass --keyfile on every command.");
    }
    output::tip("Add your first entry: guardian set <ID>");

    Ok(())
}
