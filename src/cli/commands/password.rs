//! `guardian password` — print a random printable password.

use base64::Engine;
use zeroize::Zeroizing;

use crate::crypto::password;
use crate::errors::Result;

/// How the generated password is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    Base64,
    Hex,
}

impl Encoding {
    pub fn from_flags(base64: bool, hex: bool) -> Self {
        match (base64, hex) {
            (true, _) => Encoding::Base64,
            (_, true) => Encoding::Hex,
            _ => Encoding::Raw,
        }
    }
}

/// Execute the `password` command.
pub fn execute(length: usize, encoding: Encoding) -> Result<()> {
    let rendered = render(length, encoding);
    println!("{}", rendered.as_str());
    Ok(())
}

fn render(length: usize, encoding: Encoding) -> Zeroizing<String> {
    let secret = password::generate(length);
    let bytes = secret.as_bytes();

    let text = match encoding {
        // Every byte is printable ASCII.
        Encoding::Raw => String::from_utf8_lossy(bytes).into_owned(),
        Encoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        Encoding::Hex => hex::encode(bytes),
    };
    Zeroizing::new(text)
}
