//! Content hashing with blake3.
//!
//! Rewrite cache keys and policy fingerprints are built from several ordered
//! parts. Each part is length-prefixed before hashing so `("ab", "c")` and
//! `("a", "bc")` never collide.
//!
//! # Usage
//!
//! ```ignore
//! let key = ContentHash::builder()
//!     .part(content)
//!     .part(pipeline.fingerprint())
//!     .finish();
//! ```

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a single byte slice.
    #[inline]
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// Start an ordered multi-part hash.
    #[inline]
    pub fn builder() -> HashBuilder {
        HashBuilder::default()
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex string (cache keys).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars are enough for logs
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Incremental hasher over length-prefixed parts.
#[derive(Default)]
pub struct HashBuilder {
    hasher: blake3::Hasher,
}

impl HashBuilder {
    pub fn part(mut self, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    /// Hash a list of parts as one part (count prefix, then each item).
    pub fn parts<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let items: Vec<T> = items.into_iter().collect();
        self.hasher.update(&(items.len() as u64).to_le_bytes());
        for item in &items {
            self = self.part(item);
        }
        self
    }

    pub fn finish(self) -> ContentHash {
        ContentHash(*self.hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_are_unambiguous() {
        let a = ContentHash::builder().part("ab").part("c").finish();
        let b = ContentHash::builder().part("a").part("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic() {
        let a = ContentHash::builder().part("x").parts(["1", "2"]).finish();
        let b = ContentHash::builder().part("x").parts(["1", "2"]).finish();
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
        assert_eq!(a.to_string().len(), 16);
    }

    #[test]
    fn test_list_boundaries() {
        let a = ContentHash::builder().parts(["a"]).parts(["b", "c"]).finish();
        let b = ContentHash::builder().parts(["a", "b"]).parts(["c"]).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_of_matches_blake3() {
        assert_eq!(ContentHash::of("abc").as_bytes(), blake3::hash(b"abc").as_bytes());
    }
}
