//! Hash helpers – SHA-256 en hex minúsculas.
//!
//! Abstracción mínima para que el resto del core no dependa del algoritmo.

use sha2::{Digest, Sha256};
use serde_json::Value;

use super::canonical_json::to_canonical_json;

/// SHA-256 de bytes arbitrarios, en hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    sha256_hex(input.as_bytes())
}

/// Hash del JSON canónico de `value`.
pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_digest() {
        assert_eq!(hash_str("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn value_hash_ignores_key_order() {
        assert_eq!(hash_value(&json!({"a": 1, "b": 2})), hash_value(&json!({"b": 2, "a": 1})));
        assert_ne!(hash_value(&json!({"a": 1})), hash_value(&json!({"a": 2})));
    }
}
