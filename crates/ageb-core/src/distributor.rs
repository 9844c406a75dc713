//! Deterministic load distribution over ordered candidate lists.
//!
//! The pick is `fnv1a_32(canonical(key)) % len`, so it is stable across
//! runs, processes and implementations.

use crate::error::{AgebError, Result};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a, 32-bit, over the raw bytes.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Canonical form of a distribution key: surrounding whitespace removed.
/// Case and accents are kept as given.
pub fn canonical_key(key: &str) -> &str {
    key.trim()
}

/// Returns the candidate at `fnv1a_32(key) % len`.
///
/// A single candidate is returned without hashing. An empty list is an
/// `InvalidArgument`; callers check before invoking.
pub fn pick<'c, T>(key: &str, candidates: &'c [T]) -> Result<&'c T> {
    match candidates {
        [] => Err(AgebError::InvalidArgument(
            "cannot distribute over an empty candidate list".into(),
        )),
        [only] => Ok(only),
        _ => {
            let h = fnv1a_32(canonical_key(key).as_bytes());
            Ok(&candidates[h as usize % candidates.len()])
        }
    }
}
