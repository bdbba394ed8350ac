//! `guardian get` — print the value stored under one id.

use crate::cli::{Cli, Session};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let session = Session::open(cli)?;

    // Print the bare value so it can be piped.
    let value = session.vault.get(id)?;
    println!("{value}");

    Ok(())
}
