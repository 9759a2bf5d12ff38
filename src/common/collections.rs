//! Hashing collections used throughout the crate.
//!
//! Keys are small copyable ids, so the fx hasher is a better fit than the
//! default SipHash.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
