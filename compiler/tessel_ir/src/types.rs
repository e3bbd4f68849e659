//! Interned IR types.
//!
//! A [`Type`] is a cheap handle to a canonical storage instance owned by an
//! [`IrContext`]. Because every structurally-distinct type is interned exactly
//! once, type equality and hashing are pointer identity.
//!
//! Each kind of type is its own Rust struct implementing [`TypeStorage`]:
//!
//! - scalar element types (`f32`, `i64`, ...) are parameterless singletons,
//! - [`VectorType`] (an ordered list of types) is parametric,
//! - dialects add further kinds (see `dialect::tensor::DenseTensorType`).

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::kind::{CastError, KindId};
use crate::storage::{StorageError, StorageManager};
use crate::IrContext;

/// Storage contract for a type kind.
///
/// Implemented through [`impl_type_storage!`](crate::types::impl_type_storage).
pub trait TypeStorage: Any + Send + Sync + fmt::Debug + fmt::Display {
    /// Upcast for checked downcasts.
    fn as_any(&self) -> &dyn Any;

    /// The kind this storage belongs to.
    fn kind(&self) -> KindId;
}

/// Implement [`TypeStorage`] for one or more storage structs.
macro_rules! impl_type_storage {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::types::TypeStorage for $ty {
                #[inline]
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                #[inline]
                fn kind(&self) -> $crate::kind::KindId {
                    $crate::kind::KindId::of::<Self>()
                }
            }
        )*
    };
}

pub(crate) use impl_type_storage;

/// Handle to an interned type.
#[derive(Clone)]
pub struct Type(Arc<dyn TypeStorage>);

impl Type {
    /// Wrap a canonical storage instance returned by the interning store.
    #[inline]
    pub fn from_storage<S: TypeStorage>(storage: Arc<S>) -> Self {
        Type(storage)
    }

    /// The kind of this type.
    #[inline]
    pub fn kind(&self) -> KindId {
        self.0.kind()
    }

    /// Check whether this type is of kind `S`.
    #[inline]
    pub fn isa<S: TypeStorage>(&self) -> bool {
        self.0.as_any().is::<S>()
    }

    /// Downcast to kind `S`, or `None` if this type is another kind.
    #[inline]
    pub fn dyn_cast<S: TypeStorage>(&self) -> Option<&S> {
        self.0.as_any().downcast_ref::<S>()
    }

    /// Downcast to kind `S`, reporting both kinds on mismatch.
    pub fn cast<S: TypeStorage>(&self) -> Result<&S, CastError> {
        self.dyn_cast::<S>().ok_or_else(|| CastError {
            expected: KindId::of::<S>(),
            found: self.kind(),
        })
    }

    #[inline]
    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0).cast::<()>()
    }
}

impl PartialEq for Type {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Type {}

impl Hash for Type {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.0)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

// Scalar element types

macro_rules! define_scalar_types {
    ($($(#[$meta:meta])* $ty:ident => $name:literal),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
            pub struct $ty;

            impl $ty {
                /// The canonical instance owned by `ctx`.
                pub fn get(ctx: &IrContext) -> Type {
                    Type::from_storage(ctx.storage().get_parameterless::<$ty>())
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str($name)
                }
            }

            impl_type_storage!($ty);
        )*

        /// Register every scalar element type as a parameterless kind.
        pub(crate) fn register_scalar_types(storage: &StorageManager) -> Result<(), StorageError> {
            $(storage.register_parameterless(|| $ty)?;)*
            Ok(())
        }

        /// Check whether `ty` is one of the scalar element types.
        pub fn is_scalar(ty: &Type) -> bool {
            false $(|| ty.isa::<$ty>())*
        }
    };
}

define_scalar_types! {
    /// Boolean element type.
    BoolType => "bool",
    /// Signed 8-bit integer.
    Int8Type => "i8",
    /// Unsigned 8-bit integer.
    UInt8Type => "u8",
    /// Signed 16-bit integer.
    Int16Type => "i16",
    /// Signed 32-bit integer.
    Int32Type => "i32",
    /// Signed 64-bit integer.
    Int64Type => "i64",
    /// IEEE half precision float.
    Float16Type => "f16",
    /// IEEE single precision float.
    Float32Type => "f32",
    /// IEEE double precision float.
    Float64Type => "f64",
}

// Vector type

/// Ordered list of element types, produced by list-building ops such as
/// `builtin.combine` and `pd.split`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VectorType {
    elements: Vec<Type>,
}

impl VectorType {
    /// Intern a vector type with the given elements.
    pub fn get(ctx: &IrContext, elements: Vec<Type>) -> Type {
        Type::from_storage(ctx.intern(VectorType { elements }))
    }

    /// Element types, in order.
    pub fn elements(&self) -> &[Type] {
        &self.elements
    }

    /// Element type at `index`.
    pub fn element(&self, index: usize) -> Option<&Type> {
        self.elements.get(index)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl fmt::Display for VectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("vec[")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("]")
    }
}

impl_type_storage!(VectorType);

#[cfg(test)]
mod tests;
