//! Content fingerprints for compiled functions.
//!
//! A fingerprint identifies a compiled function by its emitted code and
//! cache slot count. The code is the formatter's canonical output, so
//! comments and source layout do not affect it, while any change in the
//! memoization the compiler chose does. `memoc hash` prints fingerprints to
//! check that compilation is stable across runs and machines.

use std::fmt;

// Version byte for hash stability
const HASH_VERSION: u8 = 1;

// ─── Content Hash ──────────────────────────────────────────────────

/// A 256-bit BLAKE3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Zero hash (used as placeholder).
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Display as short base-32 (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        let mut result = String::with_capacity(8);
        for i in (0..8).rev() {
            let idx = ((val >> (i * 5)) & 0x1F) as usize;
            result.push(ALPHABET[idx] as char);
        }
        result
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

// ─── Fingerprints ──────────────────────────────────────────────────

/// Fingerprint of one compiled function: version, slot count, then code.
pub fn fingerprint(code: &str, cache_size: u32) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[HASH_VERSION]);
    hasher.update(&cache_size.to_le_bytes());
    hasher.update(code.as_bytes());
    ContentHash(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_is_eight_base32_chars() {
        let h = ContentHash::of(b"function f() {}");
        let short = h.to_short();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(h.to_hex().len(), 64);
        assert_eq!(format!("{}", h), format!("#{}", short));
    }

    #[test]
    fn test_zero_hash() {
        assert_eq!(ContentHash::zero().to_short(), "00000000");
    }

    #[test]
    fn test_fingerprint_covers_code_and_slots() {
        let a = fingerprint("function f() {}", 1);
        assert_eq!(a, fingerprint("function f() {}", 1));
        assert_ne!(a, fingerprint("function f() {}", 2));
        assert_ne!(a, fingerprint("function g() {}", 1));
    }
}
