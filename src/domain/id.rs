//! Typed identifiers for blueprints, fields, contracts, values and audit entries
//!
//! ID Format: `{prefix}-{10-char-hash}`
//! - Blueprint IDs: `bp-7f2b4c1a9e`
//! - Field IDs: `fd-...`
//! - Contract IDs: `ct-...`
//! - Contract value IDs: `cv-...`
//! - Audit log IDs: `al-...`
//!
//! Hash is derived from a seed (usually the entity name), the creation
//! timestamp and a process-local counter, so entities created in the same
//! instant with the same name still get distinct IDs.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hex characters in the hash portion of an ID
const HASH_LEN: usize = 10;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid {kind} ID format: expected '{prefix}-{{{len}-char-hash}}', got '{value}'")]
    InvalidFormat {
        kind: &'static str,
        prefix: &'static str,
        len: usize,
        value: String,
    },
}

/// Generates the hash portion of an ID from a seed and timestamp
fn generate_hash(seed: &str, timestamp: DateTime<Utc>) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let input = format!(
        "{}{}{}",
        seed,
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        seq
    );
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..HASH_LEN].to_string()
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name {
            hash: String,
        }

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Creates a new ID from a seed and timestamp
            pub fn new(seed: &str, timestamp: DateTime<Utc>) -> Self {
                Self {
                    hash: generate_hash(seed, timestamp),
                }
            }

            /// Returns the hash portion of the ID
            pub fn hash(&self) -> &str {
                &self.hash
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.hash)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let invalid = || IdError::InvalidFormat {
                    kind: $kind,
                    prefix: $prefix,
                    len: HASH_LEN,
                    value: s.to_string(),
                };

                let hash = s
                    .strip_prefix($prefix)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .ok_or_else(invalid)?;

                if hash.len() != HASH_LEN
                    || !hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
                {
                    return Err(invalid());
                }

                Ok(Self {
                    hash: hash.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

entity_id!(
    /// Blueprint ID in the format `bp-{hash}`
    BlueprintId,
    "bp",
    "blueprint"
);

entity_id!(
    /// Blueprint field ID in the format `fd-{hash}`
    FieldId,
    "fd",
    "field"
);

entity_id!(
    /// Contract ID in the format `ct-{hash}`
    ContractId,
    "ct",
    "contract"
);

entity_id!(
    /// Contract value ID in the format `cv-{hash}`
    ValueId,
    "cv",
    "contract value"
);

entity_id!(
    /// Audit log entry ID in the format `al-{hash}`
    AuditId,
    "al",
    "audit log"
);
