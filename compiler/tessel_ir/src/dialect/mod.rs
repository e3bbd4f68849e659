//! Dialects: named bundles of storage kinds and ops.
//!
//! Loading a dialect into an [`IrContext`](crate::IrContext) registers its
//! type and attribute kinds with the interning store and its ops with the op
//! registry. `builtin` is loaded by every context; other dialects are loaded
//! on demand through [`IrContext::register_dialect`](crate::IrContext::register_dialect).

pub mod builtin;
pub mod tensor;

pub use builtin::BuiltinDialect;
pub use tensor::TensorDialect;

use crate::context::{ContextError, IrContext};

/// A loadable dialect.
pub trait Dialect: Send + Sync {
    /// Unique dialect name, also the prefix of its op names.
    fn name(&self) -> &'static str;

    /// Register kinds and ops with `ctx`. Runs at most once per context.
    fn initialize(&self, ctx: &IrContext) -> Result<(), ContextError>;
}
