//! Interned operation attributes.
//!
//! Attributes follow the same model as [`Type`](crate::Type): one storage
//! struct per kind, canonical instances owned by the context, identity-based
//! equality on the [`Attribute`] handle. All builtin attribute kinds are
//! parametric.
//!
//! Floats are stored as their bit patterns so that attribute storage can be
//! `Eq + Hash`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::kind::{CastError, KindId};
use crate::storage::{StorageError, StorageManager};
use crate::IrContext;

/// Attribute dictionary of an operation, ordered by name.
pub type AttributeMap = BTreeMap<String, Attribute>;

/// Attribute names with a fixed meaning across dialects.
pub mod names {
    /// String override of the op name used for dispatch.
    pub const OP_NAME: &str = "op_name";
    /// Bool flag: results may alias inputs per the op signature.
    pub const IS_INPLACE: &str = "is_inplace";
    /// Bool flag: results live in the root scope.
    pub const IS_PERSISTABLE: &str = "is_persistable";
    /// Int32 column of a feed or fetch slot.
    pub const COL: &str = "col";
    /// Int32 element index of a list slice.
    pub const INDEX: &str = "index";
    /// String name of a parameter variable.
    pub const PARAMETER_NAME: &str = "parameter_name";
    /// String name of a feed or fetch target.
    pub const NAME: &str = "name";
}

/// Storage contract for an attribute kind.
pub trait AttributeStorage: Any + Send + Sync + fmt::Debug + fmt::Display {
    /// Upcast for checked downcasts.
    fn as_any(&self) -> &dyn Any;

    /// The kind this storage belongs to.
    fn kind(&self) -> KindId;
}

macro_rules! impl_attribute_storage {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AttributeStorage for $ty {
                #[inline]
                fn as_any(&self) -> &dyn Any {
                    self
                }

                #[inline]
                fn kind(&self) -> KindId {
                    KindId::of::<Self>()
                }
            }
        )*
    };
}

/// Handle to an interned attribute.
#[derive(Clone)]
pub struct Attribute(Arc<dyn AttributeStorage>);

impl Attribute {
    /// Wrap a canonical storage instance returned by the interning store.
    #[inline]
    pub fn from_storage<S: AttributeStorage>(storage: Arc<S>) -> Self {
        Attribute(storage)
    }

    /// The kind of this attribute.
    #[inline]
    pub fn kind(&self) -> KindId {
        self.0.kind()
    }

    /// Check whether this attribute is of kind `S`.
    #[inline]
    pub fn isa<S: AttributeStorage>(&self) -> bool {
        self.0.as_any().is::<S>()
    }

    /// Downcast to kind `S`, or `None` if this attribute is another kind.
    #[inline]
    pub fn dyn_cast<S: AttributeStorage>(&self) -> Option<&S> {
        self.0.as_any().downcast_ref::<S>()
    }

    /// Downcast to kind `S`, reporting both kinds on mismatch.
    pub fn cast<S: AttributeStorage>(&self) -> Result<&S, CastError> {
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

impl PartialEq for Attribute {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({})", self.0)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

// Builtin attribute kinds

/// UTF-8 string attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrAttribute(String);

impl StrAttribute {
    pub fn get(ctx: &IrContext, value: impl Into<String>) -> Attribute {
        Attribute::from_storage(ctx.intern(StrAttribute(value.into())))
    }

    pub fn data(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StrAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoolAttribute(bool);

impl BoolAttribute {
    pub fn get(ctx: &IrContext, value: bool) -> Attribute {
        Attribute::from_storage(ctx.intern(BoolAttribute(value)))
    }

    pub fn data(&self) -> bool {
        self.0
    }
}

impl fmt::Display for BoolAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Int32Attribute(i32);

impl Int32Attribute {
    pub fn get(ctx: &IrContext, value: i32) -> Attribute {
        Attribute::from_storage(ctx.intern(Int32Attribute(value)))
    }

    pub fn data(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Int32Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i32", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Int64Attribute(i64);

impl Int64Attribute {
    pub fn get(ctx: &IrContext, value: i64) -> Attribute {
        Attribute::from_storage(ctx.intern(Int64Attribute(value)))
    }

    pub fn data(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Int64Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i64", self.0)
    }
}

/// Single precision float attribute, stored as bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FloatAttribute(u32);

impl FloatAttribute {
    pub fn get(ctx: &IrContext, value: f32) -> Attribute {
        Attribute::from_storage(ctx.intern(FloatAttribute(value.to_bits())))
    }

    pub fn data(&self) -> f32 {
        f32::from_bits(self.0)
    }
}

impl fmt::Display for FloatAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}f32", self.data())
    }
}

/// Double precision float attribute, stored as bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DoubleAttribute(u64);

impl DoubleAttribute {
    pub fn get(ctx: &IrContext, value: f64) -> Attribute {
        Attribute::from_storage(ctx.intern(DoubleAttribute(value.to_bits())))
    }

    pub fn data(&self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Display for DoubleAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}f64", self.data())
    }
}

/// Ordered list of attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayAttribute(Vec<Attribute>);

impl ArrayAttribute {
    pub fn get(ctx: &IrContext, elements: Vec<Attribute>) -> Attribute {
        Attribute::from_storage(ctx.intern(ArrayAttribute(elements)))
    }

    pub fn elements(&self) -> &[Attribute] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ArrayAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("]")
    }
}

impl_attribute_storage!(
    StrAttribute,
    BoolAttribute,
    Int32Attribute,
    Int64Attribute,
    FloatAttribute,
    DoubleAttribute,
    ArrayAttribute,
);

/// Register every builtin attribute kind as parametric.
pub(crate) fn register_builtin_attributes(storage: &StorageManager) -> Result<(), StorageError> {
    storage.register_parametric::<StrAttribute>()?;
    storage.register_parametric::<BoolAttribute>()?;
    storage.register_parametric::<Int32Attribute>()?;
    storage.register_parametric::<Int64Attribute>()?;
    storage.register_parametric::<FloatAttribute>()?;
    storage.register_parametric::<DoubleAttribute>()?;
    storage.register_parametric::<ArrayAttribute>()?;
    Ok(())
}
