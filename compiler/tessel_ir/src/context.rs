//! The IR context.
//!
//! An [`IrContext`] owns the interning store, the set of loaded dialects and
//! the op registry. It is constructed explicitly and passed by reference;
//! share it across threads through [`SharedContext`].

use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dialect::{BuiltinDialect, Dialect};
use crate::op_info::OpInfo;
use crate::storage::{StorageError, StorageManager};

/// Error raised while loading dialects or registering ops.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("op `{name}` is already registered")]
    DuplicateOp { name: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owner of interned storage, dialects and op metadata.
pub struct IrContext {
    storage: StorageManager,
    ops: RwLock<FxHashMap<String, OpInfo>>,
    dialects: RwLock<FxHashSet<&'static str>>,
}

impl IrContext {
    /// Create a context with the builtin dialect loaded.
    ///
    /// # Panics
    /// Panics if the builtin dialect fails to register, which only happens
    /// if its kind list contains a duplicate.
    pub fn new() -> Self {
        let ctx = IrContext {
            storage: StorageManager::new(),
            ops: RwLock::new(FxHashMap::default()),
            dialects: RwLock::new(FxHashSet::default()),
        };
        if let Err(e) = ctx.register_dialect(&BuiltinDialect) {
            panic!("failed to load builtin dialect: {e}");
        }
        ctx
    }

    /// The interning store.
    #[inline]
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    /// Intern `value` into this context's store.
    ///
    /// # Panics
    /// Panics if `S` was never registered by a loaded dialect.
    pub fn intern<S>(&self, value: S) -> Arc<S>
    where
        S: Send + Sync + Hash + Eq + 'static,
    {
        self.storage
            .intern(value)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Load a dialect.
    ///
    /// Returns `Ok(false)` if a dialect with the same name is already loaded.
    /// The dialect table stays locked while `initialize` runs, so two threads
    /// loading the same dialect cannot both register its kinds.
    pub fn register_dialect(&self, dialect: &dyn Dialect) -> Result<bool, ContextError> {
        let mut dialects = self.dialects.write();
        if dialects.contains(dialect.name()) {
            return Ok(false);
        }
        dialect.initialize(self)?;
        dialects.insert(dialect.name());
        tracing::debug!(dialect = dialect.name(), "loaded dialect");
        Ok(true)
    }

    pub fn is_dialect_loaded(&self, name: &str) -> bool {
        self.dialects.read().contains(name)
    }

    /// Add an op to the registry.
    pub fn register_op(&self, info: OpInfo) -> Result<(), ContextError> {
        let mut ops = self.ops.write();
        if ops.contains_key(info.name()) {
            return Err(ContextError::DuplicateOp {
                name: info.name().to_owned(),
            });
        }
        ops.insert(info.name().to_owned(), info);
        Ok(())
    }

    /// Registry entry for `name`.
    pub fn op_info(&self, name: &str) -> Option<OpInfo> {
        self.ops.read().get(name).cloned()
    }

    pub fn is_registered_op(&self, name: &str) -> bool {
        self.ops.read().contains_key(name)
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IrContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrContext")
            .field("storage", &self.storage)
            .field("ops", &self.ops.read().len())
            .field("dialects", &self.dialects.read().len())
            .finish()
    }
}

/// Reference-counted handle to an [`IrContext`].
#[derive(Clone, Debug, Default)]
pub struct SharedContext(Arc<IrContext>);

impl SharedContext {
    pub fn new(ctx: IrContext) -> Self {
        SharedContext(Arc::new(ctx))
    }
}

impl Deref for SharedContext {
    type Target = IrContext;

    fn deref(&self) -> &IrContext {
        &self.0
    }
}
