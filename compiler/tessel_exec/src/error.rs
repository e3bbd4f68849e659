//! Binder error type.
//!
//! Every variant is a contract violation: the block being bound is
//! malformed, or a dialect registration step is missing. Nothing here is
//! retried. Expected absence (a value's first binding, a parameter that is
//! not in the root yet) never reaches this type.

use tessel_ir::{CastError, ValueId};

use crate::scope::ScopeError;
use crate::variable::PayloadError;

/// Error from [`build_scope`](crate::build_scope).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// An operand refers to a value that has no binding yet.
    #[error("operand {index} of `{op}` is not bound to a variable")]
    UnboundOperand {
        /// Effective op name.
        op: String,
        /// Operand position.
        index: usize,
    },

    /// A required attribute is absent.
    #[error("`{op}` is missing attribute `{name}`")]
    MissingAttribute { op: String, name: &'static str },

    /// An attribute has the wrong kind.
    #[error("attribute `{name}` of `{op}` has the wrong kind")]
    AttributeType {
        op: String,
        name: &'static str,
        #[source]
        source: CastError,
    },

    /// In-place binding needs registry metadata for an unknown op.
    #[error("op `{op}` is not registered")]
    UnregisteredOp { op: String },

    /// The op is registered without a static signature.
    #[error("op `{op}` has no signature")]
    MissingSignature { op: String },

    /// The signature declares fewer outputs than the op has results.
    #[error("signature of `{op}` declares no output at position {index}")]
    MissingOutputInfo { op: String, index: usize },

    /// An in-place output names an input the signature does not declare.
    #[error("output `{output}` of `{op}` aliases unknown input `{input}`")]
    UnknownInplaceInput {
        op: String,
        output: String,
        input: String,
    },

    #[error("`{op}` has no operand {index}")]
    MissingOperand { op: String, index: usize },

    #[error("`{op}` has no result {index}")]
    MissingResult { op: String, index: usize },

    /// A result type has no payload mapping.
    #[error("result of `{op}` has unsupported type `{ty}`")]
    UnsupportedOutputType { op: String, ty: String },

    /// A vector result holds something other than dense tensors.
    #[error("element {index} of a vector result of `{op}` has unsupported type `{ty}`")]
    UnsupportedNestedList {
        op: String,
        /// Element position inside the vector type.
        index: usize,
        ty: String,
    },

    #[error("`{op}` slices element {index} of a list of {len}")]
    SliceOutOfRange { op: String, index: i32, len: usize },

    /// A list element has no entry in the variable-to-name table.
    #[error("element {index} sliced by `{op}` was not created by this binder")]
    UnresolvedSliceElement { op: String, index: usize },

    /// A value is bound to a name that no visible variable carries.
    #[error("value {value:?} is bound to `{name}`, which is not visible from the scope")]
    UnresolvedBinding { value: ValueId, name: String },

    /// A feed or fetch column attribute is negative.
    #[error("`{op}` has negative column {col}")]
    InvalidColumn { op: String, col: i32 },

    #[error("the root scope has no `feed` variable")]
    FeedMissing,

    #[error("feed column {col} is out of range for a feed list of {len}")]
    FeedColumnOutOfRange { col: usize, len: usize },

    #[error("feed column {col} does not hold a dense tensor")]
    FeedItemNotTensor { col: usize },

    /// The variable list and the ordinal table diverged.
    #[error("binding tables diverged: {variables} variables, {ordinals} ordinals, {names} names")]
    TableSizeMismatch {
        variables: usize,
        ordinals: usize,
        names: usize,
    },

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}
