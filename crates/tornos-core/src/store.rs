//! Global type store: process-wide canonicalization of composite types.
//!
//! The store maps each distinct (params, results) signature pair, and each
//! distinct parameter tuple, to exactly one handle, and keeps the reverse
//! mapping for the accessors. It is deliberately a process-global: type
//! handles flow freely between modules, so a per-module table would break the
//! "handle equality is type equality" contract the IR relies on.

use crate::types::{Signature, Type};
use once_cell::sync::Lazy;
use std::sync::RwLock;
use tornos_support::FastHashMap;

/// Canonicalization tables. Internal; reached only through the free
/// functions below, so callers never manage the store's lifetime.
struct TypeStore {
    /// (params, results) -> signature id.
    signatures: FastHashMap<(Type, Type), u32>,
    /// signature id -> definition, for the accessors.
    rev_signatures: FastHashMap<u32, Signature>,
    /// tuple contents -> tuple id.
    tuples: FastHashMap<Vec<Type>, u32>,
    /// tuple id -> contents.
    rev_tuples: FastHashMap<u32, Vec<Type>>,
    /// Next composite id. Monotonic; ids are never reused.
    next_id: u32,
}

impl TypeStore {
    fn new() -> Self {
        Self {
            signatures: FastHashMap::default(),
            rev_signatures: FastHashMap::default(),
            tuples: FastHashMap::default(),
            rev_tuples: FastHashMap::default(),
            next_id: 0,
        }
    }

    fn intern_signature(&mut self, params: Type, results: Type) -> Type {
        if let Some(&id) = self.signatures.get(&(params, results)) {
            return Type::from_signature_id(id);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.signatures.insert((params, results), id);
        self.rev_signatures.insert(id, Signature::new(params, results));
        Type::from_signature_id(id)
    }

    fn intern_tuple(&mut self, types: Vec<Type>) -> Type {
        if let Some(&id) = self.tuples.get(&types) {
            return Type::from_tuple_id(id);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.tuples.insert(types.clone(), id);
        self.rev_tuples.insert(id, types);
        Type::from_tuple_id(id)
    }

    fn lookup_signature(&self, ty: Type) -> Option<Signature> {
        let id = ty.signature_id()?;
        self.rev_signatures.get(&id).copied()
    }

    fn lookup_tuple(&self, ty: Type) -> Option<Vec<Type>> {
        let id = ty.tuple_id()?;
        self.rev_tuples.get(&id).cloned()
    }
}

/// The process-wide store, initialized lazily on first use.
static TYPE_STORE: Lazy<RwLock<TypeStore>> = Lazy::new(|| RwLock::new(TypeStore::new()));

/// Intern a (params, results) signature, returning its canonical handle.
///
/// The same ordered pair always yields the same handle, from any thread, at
/// any point in the process; a different pair always yields a different
/// handle. Order is significant.
pub fn intern_signature(params: Type, results: Type) -> Type {
    // Fast path: an already-interned pair only needs the read lock.
    {
        let store = TYPE_STORE.read().unwrap();
        if let Some(&id) = store.signatures.get(&(params, results)) {
            return Type::from_signature_id(id);
        }
    }
    TYPE_STORE.write().unwrap().intern_signature(params, results)
}

/// Intern an ordered list of types as a tuple handle.
///
/// The empty list canonicalizes to [`Type::NONE`] and a single-element list
/// to that element itself, so a tuple handle always denotes two or more
/// types.
pub fn intern_tuple(types: Vec<Type>) -> Type {
    if types.is_empty() {
        return Type::NONE;
    }
    if types.len() == 1 {
        return types[0];
    }
    {
        let store = TYPE_STORE.read().unwrap();
        if let Some(&id) = store.tuples.get(&types) {
            return Type::from_tuple_id(id);
        }
    }
    TYPE_STORE.write().unwrap().intern_tuple(types)
}

/// Look up the definition of an interned signature handle.
///
/// `None` if `ty` is not a signature handle.
pub fn lookup_signature(ty: Type) -> Option<Signature> {
    TYPE_STORE.read().unwrap().lookup_signature(ty)
}

/// Look up the contents of an interned tuple handle.
///
/// `None` if `ty` is not a tuple handle.
pub fn lookup_tuple(ty: Type) -> Option<Vec<Type>> {
    TYPE_STORE.read().unwrap().lookup_tuple(ty)
}

/// The parameter type of a signature handle, or [`Type::NONE`] for any
/// non-signature handle (basic types have no parameters).
pub fn signature_params(ty: Type) -> Type {
    lookup_signature(ty).map_or(Type::NONE, |sig| sig.params)
}

/// The result type of a signature handle, or [`Type::NONE`] for any
/// non-signature handle.
pub fn signature_results(ty: Type) -> Type {
    lookup_signature(ty).map_or(Type::NONE, |sig| sig.results)
}

/// Expand a handle into the flat list of value types it denotes: `[]` for
/// [`Type::NONE`], the tuple contents for a tuple handle, `[ty]` otherwise.
pub fn expand(ty: Type) -> Vec<Type> {
    if ty == Type::NONE {
        return Vec::new();
    }
    if let Some(types) = lookup_tuple(ty) {
        return types;
    }
    vec![ty]
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pair_same_handle() {
        let a = intern_signature(Type::I32, Type::I64);
        let b = intern_signature(Type::I32, Type::I64);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_pairs_distinct_handles() {
        let ab = intern_signature(Type::I32, Type::I64);
        let ba = intern_signature(Type::I64, Type::I32);
        let cc = intern_signature(Type::F32, Type::F32);
        assert_ne!(ab, ba, "pair order must be significant");
        assert_ne!(ab, cc);
        assert_ne!(ba, cc);
    }

    #[test]
    fn accessors_invert_interning() {
        let sig = intern_signature(Type::F64, Type::I32);
        assert_eq!(signature_params(sig), Type::F64);
        assert_eq!(signature_results(sig), Type::I32);
    }

    #[test]
    fn accessors_return_none_for_basics() {
        for basic in [Type::NONE, Type::I32, Type::I64, Type::F32, Type::F64, Type::V128] {
            assert_eq!(signature_params(basic), Type::NONE);
            assert_eq!(signature_results(basic), Type::NONE);
            assert!(lookup_signature(basic).is_none());
        }
    }

    #[test]
    fn tuple_canonicalization() {
        assert_eq!(intern_tuple(vec![]), Type::NONE);
        assert_eq!(intern_tuple(vec![Type::I32]), Type::I32);

        let pair = intern_tuple(vec![Type::I32, Type::F64]);
        assert!(pair.is_tuple());
        assert_eq!(pair, intern_tuple(vec![Type::I32, Type::F64]));
        assert_ne!(pair, intern_tuple(vec![Type::F64, Type::I32]));
        assert_eq!(lookup_tuple(pair), Some(vec![Type::I32, Type::F64]));
    }

    #[test]
    fn expand_covers_all_shapes() {
        assert_eq!(expand(Type::NONE), Vec::<Type>::new());
        assert_eq!(expand(Type::I32), vec![Type::I32]);
        let pair = intern_tuple(vec![Type::I64, Type::I64]);
        assert_eq!(expand(pair), vec![Type::I64, Type::I64]);
    }

    #[test]
    fn signatures_of_composites_are_canonical_too() {
        let params = intern_tuple(vec![Type::I32, Type::I32]);
        let a = intern_signature(params, Type::I32);
        let b = intern_signature(intern_tuple(vec![Type::I32, Type::I32]), Type::I32);
        assert_eq!(a, b);
        assert_eq!(signature_params(a), params);
    }

    #[test]
    fn concurrent_interning_is_canonical() {
        let handles: Vec<Type> = std::thread::scope(|s| {
            let joins: Vec<_> = (0..8)
                .map(|_| s.spawn(|| intern_signature(Type::V128, Type::V128)))
                .collect();
            joins.into_iter().map(|j| j.join().unwrap()).collect()
        });
        for pair in handles.windows(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }
}
