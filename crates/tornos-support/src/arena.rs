//! Bump arena for string data.
//!
//! Parsing a module produces many short-lived names (function names, export
//! names, labels). The arena batches those allocations into bump-allocated
//! chunks and releases them all at once on disposal, instead of paying a heap
//! round trip per string.

use bumpalo::Bump;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A bump allocator for string data with explicit disposal.
///
/// Views returned by [`alloc_str`](Arena::alloc_str) borrow from the arena,
/// so the borrow checker scopes their validity to the arena's lifetime:
/// [`dispose`](Arena::dispose) takes `&mut self` and therefore cannot run
/// while any view is still live.
///
/// # Thread Safety
/// Allocation is mutex-serialized and may be called from any number of
/// threads concurrently. Disposal requires exclusive access, which sequences
/// it after all in-flight allocations.
pub struct Arena {
    /// `None` once the arena has been disposed.
    bump: Mutex<Option<Bump>>,
    alive: AtomicBool,
}

impl Arena {
    /// Create a new, empty arena.
    pub fn new() -> Self {
        Self {
            bump: Mutex::new(Some(Bump::new())),
            alive: AtomicBool::new(true),
        }
    }

    /// Copy `s` into arena storage and return a view of the copy.
    ///
    /// Returns `None` if the arena has already been disposed. Distinct
    /// allocations always occupy distinct storage, even for equal content:
    /// deduplication is the [interner's](crate::StringInterner) job, not the
    /// arena's.
    pub fn alloc_str(&self, s: &str) -> Option<&str> {
        let guard = self.bump.lock().unwrap();
        let bump = guard.as_ref()?;
        let copied: &str = bump.alloc_str(s);
        // SAFETY: `copied` points into a chunk owned by the `Bump`. Chunks are
        // never moved or freed while the `Bump` exists, and the `Bump` is only
        // dropped via `dispose(&mut self)` or `Drop`, both of which require
        // exclusive access, so no `&str` tied to `&self` can outlive it.
        Some(unsafe { &*(copied as *const str) })
    }

    /// Whether the arena still owns its storage.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Release all storage.
    ///
    /// Afterwards [`is_alive`](Arena::is_alive) reports `false` and every
    /// [`alloc_str`](Arena::alloc_str) call returns `None`. Calling `dispose`
    /// again is a no-op. Dropping a live arena releases storage the same way.
    pub fn dispose(&mut self) {
        self.alive.store(false, Ordering::Release);
        *self.bump.lock().unwrap() = None;
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_copies_with_distinct_storage() {
        let arena = Arena::new();
        let a = arena.alloc_str("hello").unwrap();
        let b = arena.alloc_str("world").unwrap();
        let c = arena.alloc_str("hello").unwrap();

        assert_eq!(a, "hello");
        assert_eq!(b, "world");
        assert_eq!(c, "hello");
        // Equal content, distinct storage: the arena never deduplicates.
        assert_ne!(a.as_ptr(), c.as_ptr());
        assert_ne!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn alloc_empty_string() {
        let arena = Arena::new();
        assert_eq!(arena.alloc_str(""), Some(""));
    }

    #[test]
    fn dispose_kills_liveness_and_allocation() {
        let mut arena = Arena::new();
        assert!(arena.is_alive());
        assert!(arena.alloc_str("x").is_some());

        arena.dispose();
        assert!(!arena.is_alive());
        assert_eq!(arena.alloc_str("x"), None);

        // Double dispose is a no-op.
        arena.dispose();
        assert!(!arena.is_alive());
    }

    #[test]
    fn concurrent_allocations_all_succeed() {
        let arena = Arena::new();
        std::thread::scope(|s| {
            for t in 0..8 {
                let arena = &arena;
                s.spawn(move || {
                    for i in 0..64 {
                        let text = format!("thread-{t}-{i}");
                        let view = arena.alloc_str(&text).unwrap();
                        assert_eq!(view, text);
                    }
                });
            }
        });
        assert!(arena.is_alive());
    }
}
