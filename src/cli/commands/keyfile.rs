//! `guardian keyfile` — generate a random keyfile for two-factor access.

use std::path::Path;

use crate::cli::output;
use crate::crypto::keyfile::generate_keyfile;
use crate::errors::Result;

/// Execute the `keyfile` command.
pub fn execute(path: &Path) -> Result<()> {
    generate_keyfile(path)?;

    output::success(&format!("Keyfile generated at {}", path.display()));
    output::warning("Keep this file secret! Anyone with it can help unlock your vault.");
    output::tip("Use it from the start: guardian init --keyfile <PATH>");

    Ok(())
}
