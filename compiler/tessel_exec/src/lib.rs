//! Runtime scopes and the scope binder for Tessel programs.
//!
//! This crate provides:
//!
//! - **Variables** ([`Variable`], [`Payload`]): named storage cells holding a
//!   dense tensor, a list of variable references, or a feed/fetch list.
//!
//! - **Scopes** ([`ScopeTree`]): an arena of hierarchical scopes. The root
//!   holds persistent variables, child scopes hold transient ones.
//!
//! - **Scope binder** ([`build_scope`]): walks a block of a
//!   [`tessel_ir::Program`] and binds every value to a variable, recording
//!   the result in [`BindingTables`].
//!
//! - **Feed/fetch helpers** ([`set_feed_variable`], [`get_fetch_variable`]).
//!
//! # Example
//!
//! ```
//! use tessel_exec::{
//!     build_scope, set_feed_variable, BindConfig, BindingTables, DenseTensor, ScopeTree,
//! };
//! use tessel_ir::dialect::{tensor, TensorDialect};
//! use tessel_ir::{Builder, DenseTensorType, Float32Type, IrContext, Program};
//!
//! let ctx = IrContext::new();
//! ctx.register_dialect(&TensorDialect).unwrap();
//! let mut program = Program::new();
//! let mut builder = Builder::new(&ctx, &mut program);
//! let ty = DenseTensorType::get(&ctx, Float32Type::get(&ctx), &[2]);
//! let x = tensor::feed(&mut builder, "x", 0, ty).unwrap();
//! let y = tensor::relu(&mut builder, x).unwrap();
//! tensor::fetch(&mut builder, y, "y", 0).unwrap();
//!
//! let mut scopes = ScopeTree::new();
//! set_feed_variable(&mut scopes, DenseTensor::from_f32(&[2], &[-1.0, 1.0]), 0).unwrap();
//! let scope = scopes.new_scope(scopes.root()).unwrap();
//! let mut tables = BindingTables::new();
//! build_scope(
//!     &ctx,
//!     &program,
//!     program.entry_block(),
//!     &mut scopes,
//!     scope,
//!     &mut tables,
//!     &BindConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(tables.value_name(x), Some("inner_var_0"));
//! assert_eq!(tables.value_name(y), Some("inner_var_1"));
//! ```

pub mod binder;
mod config;
mod error;
mod feed_fetch;
mod scope;
mod tables;
mod tensor;
mod tracing_setup;
mod variable;

pub use binder::{build_scope, BindRule};
pub use config::{BindConfig, DEFAULT_VAR_PREFIX};
pub use error::BindError;
pub use feed_fetch::{
    get_fetch_variable, set_feed_item, set_feed_variable, set_fetch_variable, FeedFetchError,
    FEED_VAR, FETCH_VAR,
};
pub use scope::{ScopeError, ScopeId, ScopeTree};
pub use tables::BindingTables;
pub use tensor::{DataType, DenseTensor, Lod, TensorError};
pub use tracing_setup::init_tracing;
pub use variable::{FeedItem, Payload, PayloadError, PayloadKind, VarId, Variable};
