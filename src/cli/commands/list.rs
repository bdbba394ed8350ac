//! `guardian list` — display every entry id.

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, plain: bool) -> Result<()> {
    let session = Session::open(cli)?;
    let ids = session.vault.list();

    if plain {
        for id in &ids {
            println!("{id}");
        }
        return Ok(());
    }

    output::info(&format!(
        "{} — {} entr{}",
        session.path.display(),
        ids.len(),
        if ids.len() == 1 { "y" } else { "ies" }
    ));
    output::print_ids_table(&ids);

    Ok(())
}
