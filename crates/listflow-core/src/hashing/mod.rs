//! Módulo de hashing y canonicalización JSON.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::{canonicalize, to_canonical_json, to_canonical_pretty};
pub use hash::{hash_str, hash_value, sha256_hex};
