// src/catalog/ids.rs
use base64::Engine;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const LOCAL_ID_PREFIX: &str = "local-";

/// Digest bytes kept in a local id (12 bytes -> 16 base64 chars).
const LOCAL_ID_BYTES: usize = 12;

/// Last-resort identity for a record the server sent without one.
///
/// Derived from the record's content, so normalizing the same record again
/// (or reconciling the map twice) sees the same id and keeps the same marker.
pub fn local_id(record: &Value) -> String {
    // serde_json maps are key-sorted, so the encoding is canonical.
    let canonical = serde_json::to_vec(record).unwrap_or_default();
    let digest = hash_bytes(&canonical);
    format!(
        "{LOCAL_ID_PREFIX}{}",
        base64_url_nopad(&digest[..LOCAL_ID_BYTES])
    )
}

pub fn is_local(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

fn base64_url_nopad(bytes: &[u8]) -> String {
    // URL_SAFE_NO_PAD keeps ids usable in paths and DOM attributes.
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
