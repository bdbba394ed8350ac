//! `guardian del` — remove an entry from the vault.

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::Result;

/// Execute the `del` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let mut session = Session::open(cli)?;

    // Delete the entry and save. A missing id leaves the file untouched.
    session.vault.delete(id)?;
    session.save()?;

    output::success(&format!(
        "Deleted '{id}' ({} remaining)",
        session.vault.len()
    ));

    Ok(())
}
