//! Integration tests for the Guardian vault module.

use std::fs;
use std::io::{Cursor, Seek, SeekFrom, Write};

use guardian::crypto::{CostParams, Envelope};
use guardian::errors::GuardianError;
use guardian::vault::{open_backing_file, overwrite, storage, Vault, VaultOptions};
use tempfile::TempDir;

fn cheap() -> VaultOptions {
    VaultOptions::new(CostParams::new(1, 1024, 1), 16)
}

fn saved(vault: &Vault, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    vault.save(key, &mut out).expect("save should succeed");
    out
}

// ---------------------------------------------------------------------------
// Save / open scenario
// ---------------------------------------------------------------------------

#[test]
fn save_and_open_roundtrip_scenario() {
    let options = VaultOptions::new(CostParams::new(1, 64 * 1024, 1), 64);

    let mut vault = Vault::with_options(options);
    vault.set("github.com", "alice:s3cr3t");
    let buffer = saved(&vault, b"master");

    let reopened = Vault::open(b"master", options, buffer.as_slice()).expect("open");
    assert_eq!(reopened.get("github.com").unwrap(), "alice:s3cr3t");

    let wrong = Vault::open(b"wrong", options, buffer.as_slice());
    assert!(matches!(wrong, Err(GuardianError::AuthenticationFailed)));
}

#[test]
fn empty_source_opens_empty_vault() {
    let vault = Vault::open(b"anything", cheap(), &b""[..]).unwrap();
    assert!(vault.list().is_empty());
}

#[test]
fn sentinel_envelope_opens_empty_vault() {
    let json = Envelope::sentinel().to_json().unwrap();
    let vault = Vault::open(b"anything", cheap(), json.as_slice()).unwrap();
    assert!(vault.is_empty());
}

#[test]
fn garbage_file_is_invalid_format() {
    let result = Vault::open(b"k", cheap(), &b"not json at all"[..]);
    assert!(matches!(result, Err(GuardianError::InvalidFormat(_))));
}

#[test]
fn decryptable_non_document_is_corrupt_payload() {
    // A valid envelope whose plaintext is not a vault document.
    let envelope = guardian::crypto::encrypt(b"k", b"[1, 2, 3]", &cheap().cost, 16).unwrap();
    let json = envelope.to_json().unwrap();

    let result = Vault::open(b"k", cheap(), json.as_slice());
    assert!(matches!(result, Err(GuardianError::CorruptPayload(_))));
}

#[test]
fn options_are_bound_at_open() {
    let mut vault = Vault::with_options(cheap());
    vault.set("a", "1");
    let buffer = saved(&vault, b"k");

    let stronger = VaultOptions::new(CostParams::new(2, 2048, 1), 32);
    let reopened = Vault::open(b"k", stronger, buffer.as_slice()).unwrap();
    let resaved = saved(&reopened, b"k");

    let envelope = Envelope::from_json(&resaved).unwrap();
    assert_eq!(envelope.cost, stronger.cost);
    assert_eq!(envelope.key_salt.len(), 32);
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[test]
fn crud_survives_save_and_reopen() {
    let mut vault = Vault::with_options(cheap());
    vault.set("b.example", "two");
    vault.set("a.example", "one");
    vault.set("c.example", "three");
    vault.delete("b.example").unwrap();

    let reopened = Vault::open(b"k", cheap(), saved(&vault, b"k").as_slice()).unwrap();
    assert_eq!(reopened.list(), vec!["a.example", "c.example"]);
    assert!(matches!(
        reopened.get("b.example"),
        Err(GuardianError::NotFound(_))
    ));
}

#[test]
fn values_are_stored_verbatim() {
    let mut vault = Vault::with_options(cheap());
    let odd = "line one\nline two\t\u{1F512} \"quoted\" {}";
    vault.set("odd", odd);
    vault.set("empty", "");

    let reopened = Vault::open(b"k", cheap(), saved(&vault, b"k").as_slice()).unwrap();
    assert_eq!(reopened.get("odd").unwrap(), odd);
    assert_eq!(reopened.get("empty").unwrap(), "");
}

#[test]
fn delete_then_get_is_not_found() {
    let mut vault = Vault::new();
    vault.set("id", "value");
    vault.delete("id").unwrap();
    assert!(matches!(vault.get("id"), Err(GuardianError::NotFound(_))));
    assert!(matches!(vault.delete("id"), Err(GuardianError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// Backing file
// ---------------------------------------------------------------------------

#[test]
fn overwrite_on_disk_leaves_no_stale_tail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("guardian.json");

    let mut file = open_backing_file(&path).unwrap();
    file.write_all(&vec![b'#'; 32 * 1024]).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut vault = Vault::with_options(cheap());
    vault.set("id", "value");
    overwrite(&vault, b"k", &mut file).unwrap();
    drop(file);

    let on_disk = fs::read(&path).unwrap();
    assert!(on_disk.len() < 32 * 1024);
    assert!(!on_disk.contains(&b'#'));

    let reopened = Vault::open(b"k", cheap(), on_disk.as_slice()).unwrap();
    assert_eq!(reopened.get("id").unwrap(), "value");
}

#[test]
fn failed_save_keeps_vault_usable() {
    let mut vault = Vault::with_options(VaultOptions::new(CostParams::EMPTY, 16));
    vault.set("id", "value");

    let mut backing = Cursor::new(Vec::new());
    assert!(matches!(
        overwrite(&vault, b"k", &mut backing),
        Err(GuardianError::InvalidConfiguration(_))
    ));
    assert!(backing.get_ref().is_empty());

    vault.set_options(cheap());
    overwrite(&vault, b"k", &mut backing).unwrap();
    let reopened = storage::load(&mut backing, b"k", cheap()).unwrap();
    assert_eq!(reopened.get("id").unwrap(), "value");
}

#[cfg(unix)]
#[test]
fn new_vault_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("guardian.json");
    open_backing_file(&path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o077, 0, "group/other must have no access");
}
