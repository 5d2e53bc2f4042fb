//! Stable path fingerprints.
//!
//! Uses FNV-1a for fast, const-compatible hashing. A [`TagId`] depends only on
//! the canonical path bytes, so it is identical across builds, processes and
//! registries and can be computed at compile time by generated code.

/// 64-bit fingerprint of a canonical tag path.
pub type TagId = u64;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a 64-bit hash, usable in const context.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Fingerprint a canonical path.
///
/// The input is not validated; pass canonical paths only.
#[inline]
pub const fn fingerprint(path: &str) -> TagId {
    fnv1a_64(path.as_bytes())
}
