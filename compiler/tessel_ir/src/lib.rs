//! Interning IR context for Tessel.
//!
//! This crate provides:
//!
//! - **Interning store** ([`StorageManager`]): canonical instances of types
//!   and attributes, deduplicated by hash plus structural equality, safe for
//!   concurrent callers.
//!
//! - **Handles** ([`Type`], [`Attribute`]): `Arc`-backed, compared by
//!   identity, with checked downcasts (`isa`, `dyn_cast`, `cast`).
//!
//! - **Context and dialects** ([`IrContext`], [`dialect`]): the owner of the
//!   store, the op registry, and static op signatures ([`OpSignature`]).
//!
//! - **Program arena** ([`Program`], [`Operation`], [`ValueId`]): the
//!   SSA-style dataflow graph consumed by the scope binder.
//!
//! - **Op builder** ([`Builder`]): creates operations at a cursor.
//!
//! # Example
//!
//! ```
//! use tessel_ir::dialect::{tensor, TensorDialect};
//! use tessel_ir::{Builder, DenseTensorType, Float32Type, IrContext, Program};
//!
//! let ctx = IrContext::new();
//! ctx.register_dialect(&TensorDialect).unwrap();
//!
//! let mut program = Program::new();
//! let mut builder = Builder::new(&ctx, &mut program);
//! let f32_ty = Float32Type::get(&ctx);
//! let ty = DenseTensorType::get(&ctx, f32_ty.clone(), &[2, 3]);
//! let x = tensor::feed(&mut builder, "x", 0, ty.clone()).unwrap();
//! let y = tensor::relu(&mut builder, x).unwrap();
//! tensor::fetch(&mut builder, y, "y", 0).unwrap();
//!
//! assert_eq!(ty, DenseTensorType::get(&ctx, f32_ty, &[2, 3]));
//! assert_eq!(program.ops_in(program.entry_block()).count(), 3);
//! ```

pub mod attribute;
pub mod builder;
mod context;
pub mod dialect;
pub mod kind;
pub mod op_info;
pub mod program;
pub mod storage;
pub mod types;

pub use attribute::{
    ArrayAttribute, Attribute, AttributeMap, AttributeStorage, BoolAttribute, DoubleAttribute,
    FloatAttribute, Int32Attribute, Int64Attribute, StrAttribute,
};
pub use builder::{BuildError, Builder, OperationArgument};
pub use context::{ContextError, IrContext, SharedContext};
pub use dialect::tensor::{DataLayout, DenseTensorType};
pub use dialect::Dialect;
pub use kind::{CastError, KindId};
pub use op_info::{OpInfo, OpSignature};
pub use program::{Block, BlockId, OpId, Operation, Program, ValueData, ValueId};
pub use storage::{fx_hash, StorageError, StorageManager};
pub use types::{
    is_scalar, BoolType, Float16Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, Type, TypeStorage, UInt8Type, VectorType,
};
