//! Canonicalizing string interner.
//!
//! Stores each distinct string content exactly once and hands out views into
//! that canonical storage. Downstream code compares interned names by storage
//! identity (pointer equality) instead of content, so canonicalization, not
//! just content equality, is the load-bearing guarantee here.

use crate::hash::FastHashMap;
use std::sync::RwLock;

/// Deduplicating store of string contents.
///
/// Two [`intern`](StringInterner::intern) calls with bytewise-equal input
/// return views of the *same* storage, from any thread, for the interner's
/// whole lifetime. Dropping the interner releases all storage; the returned
/// views borrow from it, so the borrow checker rejects any use after that.
///
/// # Thread Safety
/// Read-mostly: lookups take a read lock, first-time insertions upgrade to a
/// write lock with a re-check (another thread may have interned the same
/// content in between).
pub struct StringInterner {
    strings: RwLock<FastHashMap<Box<str>, ()>>,
}

impl StringInterner {
    /// Create a new, empty interner.
    pub fn new() -> Self {
        Self {
            strings: RwLock::new(FastHashMap::default()),
        }
    }

    /// Return the canonical view for `s`, storing a copy on first sight.
    pub fn intern(&self, s: &str) -> &str {
        // Fast path: read lock.
        {
            let strings = self.strings.read().unwrap();
            if let Some((stored, _)) = strings.get_key_value(s) {
                // SAFETY: see below.
                return unsafe { &*(stored.as_ref() as *const str) };
            }
        }

        // Slow path: write lock, re-check, insert.
        let mut strings = self.strings.write().unwrap();
        if let Some((stored, _)) = strings.get_key_value(s) {
            // SAFETY: see below.
            return unsafe { &*(stored.as_ref() as *const str) };
        }

        let boxed: Box<str> = Box::from(s);
        let stored: *const str = &*boxed;
        strings.insert(boxed, ());
        // SAFETY: the view points at the heap data of a boxed key. Keys are
        // never removed, and rehashing moves the box (a pointer), not the
        // data it points to. The boxes are freed only when the map is dropped
        // with the interner itself, which the `&self` borrow outlives-checks.
        unsafe { &*stored }
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.strings.read().unwrap().len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
