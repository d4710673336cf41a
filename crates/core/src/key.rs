//! Deterministic object-store keys.
//!
//! A key is a pure function of the job's URL identity, never of wall-clock
//! time or delivery count. Redelivering a job therefore rewrites the same
//! key, and the second put is an overwrite rather than a fresh orphan
//! object.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::url::SourceUrl;

/// Content type assumed when the source declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A derived object-store key: `<sha256-hex>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derive the key under which `url`'s body is stored.
    ///
    /// Lowercase hex SHA-256 of the normalized URL string, suffixed with an
    /// extension inferred from `content_type`.
    pub fn derive(url: &SourceUrl, content_type: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(format!("{digest}.{}", extension_for(content_type)))
    }

    /// Wrap an already-derived key, e.g. one read back from a lookup path.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a MIME type to a key extension. Unknown types get `bin`.
fn extension_for(content_type: &str) -> &'static str {
    // Parameters (`; charset=...`) do not affect the extension.
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .trim();

    match essence {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        "application/json" => "json",
        "text/html" => "html",
        "text/plain" => "txt",
        _ => "bin",
    }
}
