//! Upload fingerprinting: decide "new file" vs. "same file" cheaply.
//!
//! The fingerprint is SHA-256 over the file name, the declared size as a
//! decimal string, and the first 512 content bytes. Hashing only the head
//! keeps this O(1) in document size; a re-upload that changes only bytes
//! past the head but keeps name and size is treated as the same document.

use crate::document::Document;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of leading content bytes that enter the digest.
pub const HEAD_BYTES: usize = 512;

/// Stable identity token for an uploaded document.
///
/// Either a 64-character lowercase hex digest or the empty sentinel
/// ([`Fingerprint::empty`]) standing for "no document".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The sentinel for an absent document. Never equal to a real digest.
    pub fn empty() -> Self {
        Fingerprint(String::new())
    }

    /// Whether this is the absent-document sentinel.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Fingerprint an optional document.
pub fn fingerprint(doc: Option<&Document>) -> Fingerprint {
    match doc {
        None => Fingerprint::empty(),
        Some(doc) => fingerprint_parts(doc.name(), doc.size(), doc.content()),
    }
}

/// Fingerprint from the three raw inputs.
///
/// `SHA-256( name_utf8 ‖ decimal(size) ‖ content[..min(512, len)] )`
pub fn fingerprint_parts(name: &str, size: u64, content: &[u8]) -> Fingerprint {
    let head = &content[..content.len().min(HEAD_BYTES)];
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(size.to_string().as_bytes());
    hasher.update(head);
    Fingerprint(hex::encode(hasher.finalize()))
}
