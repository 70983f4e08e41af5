//! Fast non-cryptographic hashing.
//!
//! All internal lookup tables (the type store's canonicalization maps, the
//! interner, the writer's signature dedup table) hash through `ahash`, which
//! trades collision resistance against adversaries for raw speed.

use ahash::RandomState;
use once_cell::sync::Lazy;
use std::hash::BuildHasher;

/// Hash map keyed with the ahash hasher.
///
/// Single-owner: not safe for concurrent mutation without external locking.
/// `insert` overwrites the value of an existing key, `get` distinguishes an
/// absent key from a present key with any value (including zero), and `len`
/// counts distinct keys.
pub type FastHashMap<K, V> = ahash::AHashMap<K, V>;

/// Hasher state shared by every `hash_bytes` call, so equal content hashes
/// equally for the whole process run. The state is randomly seeded at first
/// use: hashes are NOT stable across process runs or crate versions.
static HASH_STATE: Lazy<RandomState> = Lazy::new(RandomState::new);

/// Hash a byte slice to a 64-bit fingerprint.
///
/// Deterministic for identical content within one process run.
pub fn hash_bytes(data: &[u8]) -> u64 {
    HASH_STATE.hash_one(data)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bytes_is_deterministic_in_process() {
        let data = b"the quick brown fox";
        assert_eq!(hash_bytes(data), hash_bytes(data));
        assert_eq!(hash_bytes(&data.to_vec()), hash_bytes(data));
    }

    #[test]
    fn hash_bytes_separates_contents() {
        // Not a guarantee for arbitrary inputs, but a 64-bit hash colliding on
        // these would indicate the state is not being applied at all.
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
        assert_ne!(hash_bytes(b""), hash_bytes(b"\0"));
    }

    #[test]
    fn map_distinguishes_absent_from_zero() {
        let mut map: FastHashMap<String, u64> = FastHashMap::default();
        map.insert("zero".to_string(), 0);
        assert_eq!(map.get("zero"), Some(&0));
        assert_eq!(map.get("never-inserted"), None);
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let mut map: FastHashMap<String, u64> = FastHashMap::default();
        assert_eq!(map.insert("k".to_string(), 1), None);
        assert_eq!(map.insert("k".to_string(), 2), Some(1));
        assert_eq!(map.get("k"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn len_counts_distinct_keys_not_inserts() {
        let mut map: FastHashMap<String, u64> = FastHashMap::default();
        for i in 0..10u64 {
            map.insert(format!("key-{}", i % 3), i);
        }
        assert_eq!(map.len(), 3);
    }
}
