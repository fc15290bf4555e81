//! ID and token generation for fixit
//!
//! Record IDs are sequential (`fix-12`, `usr-3`) so creation order is
//! visible from the ID alone. Session tokens are opaque hash-based strings.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Prefix carried by every session token
pub const TOKEN_PREFIX: &str = "fxs_";

/// Monotonic counter handing out record IDs
#[derive(Debug, Clone)]
pub struct Sequence {
    prefix: String,
    next: u64,
}

impl Sequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Allocate the next ID
    pub fn next_id(&mut self) -> String {
        let id = format_id(&self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Format a sequential record ID
pub fn format_id(prefix: &str, n: u64) -> String {
    format!("{}-{}", prefix, n)
}

/// Generate an opaque session token
///
/// SHA-256 over a v4 UUID and the current timestamp, encoded as lowercase
/// Crockford base32.
pub fn generate_token() -> String {
    let uuid = Uuid::new_v4();
    let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(uuid.as_bytes());
    hasher.update(timestamp.to_le_bytes());

    let hash = hasher.finalize();
    let encoded = base32::encode(base32::Alphabet::Crockford, &hash).to_lowercase();

    format!("{}{}", TOKEN_PREFIX, encoded)
}
