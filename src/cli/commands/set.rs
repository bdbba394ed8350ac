//! `guardian set` — add or update an entry.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::{GuardianError, Result};

/// Execute the `set` command.
pub fn execute(cli: &Cli, id: &str, value: Option<&str>) -> Result<()> {
    // Open first: with --no-prompt the master key is the first stdin line
    // and a piped value follows it.
    let mut session = Session::open(cli)?;

    let secret_value = read_value(id, value)?;

    let existed = session.vault.contains(id);
    session.vault.set(id, secret_value.as_str());
    session.save()?;

    let verb = if existed { "Updated" } else { "Added" };
    output::success(&format!(
        "{verb} '{id}' in {} ({} total)",
        session.path.display(),
        session.vault.len()
    ));

    Ok(())
}

/// The value from one of three sources: argument, piped stdin, prompt.
fn read_value(id: &str, value: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        // Source 2: Piped input. One trailing newline is dropped.
        let mut buf = Zeroizing::new(String::new());
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| GuardianError::io("failed to read value from stdin", e))?;
        let trimmed = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    // Source 3: Interactive secure prompt.
    let entered = dialoguer::Password::new()
        .with_prompt(format!("Value for {id}"))
        .allow_empty_password(true)
        .interact()
        .map_err(|e| GuardianError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(entered))
}
