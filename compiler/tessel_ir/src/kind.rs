//! Kind identifiers for interned storage.
//!
//! Every interned object belongs to exactly one kind, and the kind is the Rust
//! type of its storage struct. `KindId` pairs the `std::any::TypeId` used for
//! map keys with the type name used in diagnostics.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of an interned storage kind.
///
/// Equality and hashing only look at the `TypeId`; the name is carried for
/// error messages.
#[derive(Copy, Clone)]
pub struct KindId {
    id: TypeId,
    name: &'static str,
}

impl KindId {
    /// The kind identifier of storage type `S`.
    #[inline]
    pub fn of<S: 'static>() -> Self {
        KindId {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// Fully qualified Rust type name of the kind.
    #[inline]
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`tessel_ir::types::Float32Type` -> `Float32Type`).
    pub fn short_name(self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for KindId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for KindId {}

impl Hash for KindId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KindId({})", self.short_name())
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Error returned by a checked downcast of a type or attribute handle.
///
/// Replaces the string errors of an unchecked `isa`/`cast` pair: callers can
/// report both the kind they asked for and the kind they got.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot cast `{found}` to `{expected}`")]
pub struct CastError {
    /// The requested kind.
    pub expected: KindId,
    /// The kind of the handle that was cast.
    pub found: KindId,
}
