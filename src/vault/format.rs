//! Serialized forms used by the vault.
//!
//! Two layers:
//!
//! - The **plaintext document**, produced before encryption and after
//!   decryption: `{"secrets": {"example.com": "user:pass", ...}}`.
//! - The **envelope file**: the JSON-encoded [`Envelope`] that actually
//!   lands on disk.  A zero-length file means "no vault yet".

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::crypto::{Envelope, SecretBuffer};
use crate::errors::{GuardianError, Result};

#[derive(Serialize)]
struct DocumentRef<'a> {
    secrets: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    secrets: HashMap<String, String>,
}

/// Encode the secret map as the plaintext document.
///
/// The JSON lands straight in a `SecretBuffer` so it is wiped once
/// encrypted.
pub fn encode_document(secrets: &HashMap<String, String>) -> Result<SecretBuffer> {
    serde_json::to_vec(&DocumentRef { secrets })
        .map(SecretBuffer::from)
        .map_err(|e| GuardianError::SerializationError(format!("vault document: {e}")))
}

/// Decode a decrypted plaintext document into the secret map.
///
/// Decryption already succeeded at this point, so a parse failure is
/// `CorruptPayload`, not an authentication problem.
pub fn decode_document(bytes: &[u8]) -> Result<HashMap<String, String>> {
    serde_json::from_slice::<Document>(bytes)
        .map(|doc| doc.secrets)
        .map_err(|e| GuardianError::CorruptPayload(format!("vault document JSON: {e}")))
}

/// Read an envelope file.  Returns `None` for a zero-length source.
pub fn read_envelope<R: Read>(mut reader: R) -> Result<Option<Envelope>> {
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(|e| GuardianError::io("failed to read vault file", e))?;

    if raw.is_empty() {
        return Ok(None);
    }

    Envelope::from_json(&raw).map(Some)
}

/// Write an envelope file in one `write_all`.
pub fn write_envelope<W: Write>(mut writer: W, envelope: &Envelope) -> Result<()> {
    let bytes = envelope.to_json()?;
    writer
        .write_all(&bytes)
        .map_err(|e| GuardianError::io("failed to write vault file", e))?;
    writer
        .flush()
        .map_err(|e| GuardianError::io("failed to flush vault file", e))
}
