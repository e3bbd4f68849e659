//! Interning store for types and attributes.
//!
//! Every kind of structural object is registered once, either as
//! *parameterless* (one canonical instance, built at registration) or as
//! *parametric* (a cache of instances deduplicated by hash and equality).
//!
//! # Hash Collisions
//!
//! A parametric cache is a bucketed multimap: the bucket key is the
//! caller-supplied hash, and every entry in a bucket is tested with the
//! caller's equality predicate before it is returned. Two structurally
//! different values that share a hash live side by side in one bucket.
//!
//! # Thread Safety
//! The parametric and parameterless tables have independent locks, and each
//! parametric kind has its own `RwLock`, so different kinds intern in
//! parallel. Lookup-or-create within a kind is atomic: the constructor runs
//! under the kind's write lock, so no thread can observe two canonical
//! instances of equal values. Constructors must not intern into their own
//! kind.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::kind::KindId;

/// Type-erased canonical instance.
type StorageRef = Arc<dyn Any + Send + Sync>;

/// Error raised by the interning store.
///
/// All variants signal a missing or duplicated static registration step,
/// never a data problem.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Storage was requested for a kind that was never registered.
    #[error("storage kind `{kind}` was never registered with the context")]
    UnregisteredKind { kind: KindId },
    /// A kind was registered twice.
    #[error("storage kind `{kind}` is already registered")]
    AlreadyRegistered { kind: KindId },
    /// A cache entry did not hold the storage type of its kind.
    #[error("interned entry does not hold storage of kind `{kind}`")]
    KindMismatch { kind: KindId },
}

/// Hash a value with `FxHasher`.
///
/// This is the hash used by [`StorageManager::intern`]; callers that build
/// their own `get_or_create` requests may use any deterministic hash.
pub fn fx_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Per-kind cache of parametric instances.
#[derive(Default)]
struct ParametricStorage {
    /// Hash bucket -> every instance whose parameters produced that hash.
    buckets: FxHashMap<u64, SmallVec<[StorageRef; 1]>>,
    /// Total number of instances across all buckets.
    len: usize,
}

impl ParametricStorage {
    fn find<S, K>(
        &self,
        hash: u64,
        key: &K,
        equals: &impl Fn(&S, &K) -> bool,
    ) -> Option<&StorageRef>
    where
        S: Any + Send + Sync,
    {
        self.buckets.get(&hash)?.iter().find(|entry| {
            (***entry)
                .downcast_ref::<S>()
                .is_some_and(|storage| equals(storage, key))
        })
    }

    fn insert(&mut self, hash: u64, storage: StorageRef) {
        self.buckets.entry(hash).or_default().push(storage);
        self.len += 1;
    }
}

fn downcast<S: Any + Send + Sync>(
    entry: &StorageRef,
    kind: KindId,
) -> Result<Arc<S>, StorageError> {
    Arc::clone(entry)
        .downcast::<S>()
        .map_err(|_| StorageError::KindMismatch { kind })
}

/// Owner of every canonical type and attribute instance of one context.
pub struct StorageManager {
    parametric: RwLock<FxHashMap<KindId, Arc<RwLock<ParametricStorage>>>>,
    parameterless: RwLock<FxHashMap<KindId, StorageRef>>,
}

impl StorageManager {
    /// Create an empty store with no registered kinds.
    pub fn new() -> Self {
        StorageManager {
            parametric: RwLock::new(FxHashMap::default()),
            parameterless: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a parametric kind with an empty cache.
    pub fn register_parametric<S: Any + Send + Sync>(&self) -> Result<(), StorageError> {
        let kind = KindId::of::<S>();
        match self.parametric.write().entry(kind) {
            Entry::Occupied(_) => Err(StorageError::AlreadyRegistered { kind }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RwLock::new(ParametricStorage::default())));
                tracing::trace!(%kind, "registered parametric storage");
                Ok(())
            }
        }
    }

    /// Register a parameterless kind, constructing its canonical instance now.
    pub fn register_parameterless<S: Any + Send + Sync>(
        &self,
        constructor: impl FnOnce() -> S,
    ) -> Result<(), StorageError> {
        let kind = KindId::of::<S>();
        match self.parameterless.write().entry(kind) {
            Entry::Occupied(_) => Err(StorageError::AlreadyRegistered { kind }),
            Entry::Vacant(slot) => {
                let storage: StorageRef = Arc::new(constructor());
                slot.insert(storage);
                tracing::trace!(%kind, "registered parameterless storage");
                Ok(())
            }
        }
    }

    /// Check whether `S` was registered as either parametric or parameterless.
    pub fn is_registered<S: Any + Send + Sync>(&self) -> bool {
        let kind = KindId::of::<S>();
        self.parametric.read().contains_key(&kind) || self.parameterless.read().contains_key(&kind)
    }

    /// Try to find a structurally-equal instance of `S`, creating one on miss.
    ///
    /// `hash` selects the bucket; `equals` decides whether a bucket entry is
    /// the requested value. `constructor` runs at most once, under the kind's
    /// write lock, and only when no entry matched.
    pub fn try_get_or_create<S: Any + Send + Sync>(
        &self,
        hash: u64,
        equals: impl Fn(&S) -> bool,
        constructor: impl FnOnce() -> S,
    ) -> Result<Arc<S>, StorageError> {
        self.lookup_or_insert(hash, (), |storage, _| equals(storage), |()| constructor())
    }

    /// Find or create a parametric instance.
    ///
    /// # Panics
    /// Panics if `S` was never registered. Use `try_get_or_create` for the
    /// fallible version.
    pub fn get_or_create<S: Any + Send + Sync>(
        &self,
        hash: u64,
        equals: impl Fn(&S) -> bool,
        constructor: impl FnOnce() -> S,
    ) -> Arc<S> {
        self.try_get_or_create(hash, equals, constructor)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Intern `value` using its own `Hash` and `Eq`.
    ///
    /// Returns the canonical instance: `value` itself if it is new, otherwise
    /// the previously interned equal value (and `value` is dropped).
    pub fn intern<S: Any + Send + Sync + Hash + Eq>(
        &self,
        value: S,
    ) -> Result<Arc<S>, StorageError> {
        let hash = fx_hash(&value);
        self.lookup_or_insert(hash, value, |storage: &S, value| storage == value, |value| value)
    }

    /// Try to get the canonical instance of a parameterless kind.
    pub fn try_get_parameterless<S: Any + Send + Sync>(&self) -> Result<Arc<S>, StorageError> {
        let kind = KindId::of::<S>();
        let table = self.parameterless.read();
        let entry = table
            .get(&kind)
            .ok_or(StorageError::UnregisteredKind { kind })?;
        downcast(entry, kind)
    }

    /// Get the canonical instance of a parameterless kind.
    ///
    /// # Panics
    /// Panics if `S` was never registered.
    pub fn get_parameterless<S: Any + Send + Sync>(&self) -> Arc<S> {
        self.try_get_parameterless()
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Number of canonical instances of `S`.
    ///
    /// Parameterless kinds always report 1.
    pub fn instance_count<S: Any + Send + Sync>(&self) -> Result<usize, StorageError> {
        let kind = KindId::of::<S>();
        if self.parameterless.read().contains_key(&kind) {
            return Ok(1);
        }
        Ok(self.parametric_cache(kind)?.read().len)
    }

    fn parametric_cache(
        &self,
        kind: KindId,
    ) -> Result<Arc<RwLock<ParametricStorage>>, StorageError> {
        self.parametric
            .read()
            .get(&kind)
            .cloned()
            .ok_or(StorageError::UnregisteredKind { kind })
    }

    /// Shared lookup-or-insert path.
    ///
    /// `key` is handed to `equals` by reference and moved into `construct`
    /// only on a miss.
    fn lookup_or_insert<S, K>(
        &self,
        hash: u64,
        key: K,
        equals: impl Fn(&S, &K) -> bool,
        construct: impl FnOnce(K) -> S,
    ) -> Result<Arc<S>, StorageError>
    where
        S: Any + Send + Sync,
    {
        let kind = KindId::of::<S>();
        let cache = self.parametric_cache(kind)?;

        // Fast path: check if already interned
        {
            let guard = cache.read();
            if let Some(entry) = guard.find(hash, &key, &equals) {
                return downcast(entry, kind);
            }
        }

        // Slow path: need to insert
        let mut guard = cache.write();

        // Double-check after acquiring write lock
        if let Some(entry) = guard.find(hash, &key, &equals) {
            return downcast(entry, kind);
        }

        let storage = Arc::new(construct(key));
        let entry: StorageRef = storage.clone();
        guard.insert(hash, entry);
        tracing::trace!(%kind, hash, "created parametric storage");
        Ok(storage)
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageManager")
            .field("parametric_kinds", &self.parametric.read().len())
            .field("parameterless_kinds", &self.parameterless.read().len())
            .finish()
    }
}
