//! The `pd` tensor dialect.
//!
//! Provides [`DenseTensorType`] and a small set of tensor ops, including the
//! `pd.feed`/`pd.fetch` I/O pseudo-ops and in-place variants (`pd.add_`,
//! `pd.relu_`, `pd.scale_`) whose signatures declare `out` aliasing `x`.

use std::fmt;

use smallvec::SmallVec;

use crate::attribute::names;
use crate::builder::{BuildError, Builder, OperationArgument};
use crate::context::{ContextError, IrContext};
use crate::op_info::{OpInfo, OpSignature};
use crate::program::{OpId, ValueId};
use crate::types::{impl_type_storage, Type, VectorType};

use super::Dialect;

pub const FEED: &str = "pd.feed";
pub const FETCH: &str = "pd.fetch";
pub const FULL: &str = "pd.full";
pub const ADD: &str = "pd.add";
pub const ADD_: &str = "pd.add_";
pub const RELU: &str = "pd.relu";
pub const RELU_: &str = "pd.relu_";
pub const SCALE_: &str = "pd.scale_";
pub const SPLIT: &str = "pd.split";
pub const CONCAT: &str = "pd.concat";

/// Memory layout of a dense tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataLayout {
    #[default]
    Nchw,
    Nhwc,
    Any,
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataLayout::Nchw => "NCHW",
            DataLayout::Nhwc => "NHWC",
            DataLayout::Any => "ANY",
        })
    }
}

/// Dense tensor type. A dimension of `-1` is unknown.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DenseTensorType {
    dtype: Type,
    dims: SmallVec<[i64; 4]>,
    layout: DataLayout,
    lod: Vec<Vec<usize>>,
    offset: usize,
}

impl DenseTensorType {
    /// Uninterned storage with default layout, no lod and zero offset.
    pub fn new(dtype: Type, dims: &[i64]) -> Self {
        DenseTensorType {
            dtype,
            dims: SmallVec::from_slice(dims),
            layout: DataLayout::default(),
            lod: Vec::new(),
            offset: 0,
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: DataLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_lod(mut self, lod: Vec<Vec<usize>>) -> Self {
        self.lod = lod;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Intern this storage into `ctx`.
    ///
    /// # Panics
    /// Panics if the tensor dialect is not loaded.
    pub fn intern(self, ctx: &IrContext) -> Type {
        Type::from_storage(ctx.intern(self))
    }

    /// Shorthand for `DenseTensorType::new(dtype, dims).intern(ctx)`.
    pub fn get(ctx: &IrContext, dtype: Type, dims: &[i64]) -> Type {
        Self::new(dtype, dims).intern(ctx)
    }

    pub fn dtype(&self) -> &Type {
        &self.dtype
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn lod(&self) -> &[Vec<usize>] {
        &self.lod
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Element count, `None` if any dimension is unknown.
    pub fn numel(&self) -> Option<i64> {
        self.dims
            .iter()
            .try_fold(1_i64, |acc, &d| (d >= 0).then(|| acc * d))
    }
}

impl fmt::Display for DenseTensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tensor<")?;
        for dim in &self.dims {
            if *dim < 0 {
                f.write_str("?x")?;
            } else {
                write!(f, "{dim}x")?;
            }
        }
        write!(f, "{}>", self.dtype)
    }
}

impl_type_storage!(DenseTensorType);

#[derive(Clone, Copy, Debug, Default)]
pub struct TensorDialect;

impl Dialect for TensorDialect {
    fn name(&self) -> &'static str {
        "pd"
    }

    fn initialize(&self, ctx: &IrContext) -> Result<(), ContextError> {
        ctx.storage().register_parametric::<DenseTensorType>()?;

        let binary = || OpSignature::new().input("x").input("y").output("out");
        let unary = || OpSignature::new().input("x").output("out");
        let ops = [
            OpInfo::with_signature(
                FEED,
                OpSignature::new()
                    .attribute(names::NAME)
                    .attribute(names::COL)
                    .output("out"),
            ),
            OpInfo::with_signature(
                FETCH,
                OpSignature::new()
                    .input("x")
                    .attribute(names::NAME)
                    .attribute(names::COL),
            ),
            OpInfo::with_signature(
                FULL,
                OpSignature::new()
                    .attribute("shape")
                    .attribute("value")
                    .output("out"),
            ),
            OpInfo::with_signature(ADD, binary()),
            OpInfo::with_signature(ADD_, binary().inplace("out", "x")),
            OpInfo::with_signature(RELU, unary()),
            OpInfo::with_signature(RELU_, unary().inplace("out", "x")),
            OpInfo::with_signature(
                SCALE_,
                OpSignature::new()
                    .input("x")
                    .attribute("scale")
                    .attribute("bias")
                    .output("out")
                    .inplace("out", "x"),
            ),
            OpInfo::with_signature(
                SPLIT,
                OpSignature::new()
                    .input("x")
                    .attribute("num")
                    .attribute("axis")
                    .output("out"),
            ),
            OpInfo::with_signature(
                CONCAT,
                OpSignature::new().input("x").attribute("axis").output("out"),
            ),
        ];
        for op in ops {
            ctx.register_op(op)?;
        }
        Ok(())
    }
}

// Op helpers

fn value_type(builder: &Builder<'_>, value: ValueId) -> Option<Type> {
    builder.program().value_type(value).cloned()
}

fn with_result(argument: OperationArgument, ty: Option<Type>) -> OperationArgument {
    match ty {
        Some(ty) => argument.result(ty),
        None => argument.untyped_result(),
    }
}

/// `pd.feed`: read column `col` of the feed list.
pub fn feed(
    builder: &mut Builder<'_>,
    name: &str,
    col: i32,
    ty: Type,
) -> Result<ValueId, BuildError> {
    let argument = OperationArgument::new(FEED)
        .attribute(names::NAME, builder.str_attr(name))
        .attribute(names::COL, builder.int32_attr(col))
        .result(ty);
    builder.create_value(argument)
}

/// `pd.fetch`: reserve column `col` of the fetch list for `value`.
pub fn fetch(
    builder: &mut Builder<'_>,
    value: ValueId,
    name: &str,
    col: i32,
) -> Result<OpId, BuildError> {
    let argument = OperationArgument::new(FETCH)
        .operand(value)
        .attribute(names::NAME, builder.str_attr(name))
        .attribute(names::COL, builder.int32_attr(col));
    builder.create(argument)
}

/// `pd.full`: a tensor of `dims` filled with `value`.
///
/// Set `persistable` to keep the result in the root scope.
pub fn full(
    builder: &mut Builder<'_>,
    dtype: Type,
    dims: &[i64],
    value: f32,
    persistable: bool,
) -> Result<ValueId, BuildError> {
    let ctx = builder.context();
    let shape = builder.array_attr(dims.iter().map(|&d| builder.int64_attr(d)).collect());
    let mut argument = OperationArgument::new(FULL)
        .attribute("shape", shape)
        .attribute("value", builder.float_attr(value))
        .result(DenseTensorType::get(ctx, dtype, dims));
    if persistable {
        argument = argument.attribute(names::IS_PERSISTABLE, builder.bool_attr(true));
    }
    builder.create_value(argument)
}

fn binary(
    builder: &mut Builder<'_>,
    name: &str,
    x: ValueId,
    y: ValueId,
) -> Result<ValueId, BuildError> {
    let ty = value_type(builder, x);
    let mut argument = with_result(OperationArgument::new(name).operand(x).operand(y), ty);
    if name == ADD_ {
        argument = argument.attribute(names::IS_INPLACE, builder.bool_attr(true));
    }
    builder.create_value(argument)
}

fn unary(builder: &mut Builder<'_>, name: &str, x: ValueId) -> Result<ValueId, BuildError> {
    let ty = value_type(builder, x);
    let mut argument = with_result(OperationArgument::new(name).operand(x), ty);
    if name == RELU_ {
        argument = argument.attribute(names::IS_INPLACE, builder.bool_attr(true));
    }
    builder.create_value(argument)
}

/// `pd.add`
pub fn add(builder: &mut Builder<'_>, x: ValueId, y: ValueId) -> Result<ValueId, BuildError> {
    binary(builder, ADD, x, y)
}

/// `pd.add_`: writes the sum into `x`.
pub fn add_(builder: &mut Builder<'_>, x: ValueId, y: ValueId) -> Result<ValueId, BuildError> {
    binary(builder, ADD_, x, y)
}

/// `pd.relu`
pub fn relu(builder: &mut Builder<'_>, x: ValueId) -> Result<ValueId, BuildError> {
    unary(builder, RELU, x)
}

/// `pd.relu_`: rectifies `x` in place.
pub fn relu_(builder: &mut Builder<'_>, x: ValueId) -> Result<ValueId, BuildError> {
    unary(builder, RELU_, x)
}

/// `pd.scale_`: `x = x * scale + bias` in place.
pub fn scale_(
    builder: &mut Builder<'_>,
    x: ValueId,
    scale: f32,
    bias: f32,
) -> Result<ValueId, BuildError> {
    let ty = value_type(builder, x);
    let argument = with_result(
        OperationArgument::new(SCALE_)
            .operand(x)
            .attribute("scale", builder.float_attr(scale))
            .attribute("bias", builder.float_attr(bias))
            .attribute(names::IS_INPLACE, builder.bool_attr(true)),
        ty,
    );
    builder.create_value(argument)
}

/// `pd.split`: `num` equal parts along `axis`, as one vector value.
///
/// The split dimension becomes unknown unless it divides evenly.
pub fn split(
    builder: &mut Builder<'_>,
    x: ValueId,
    num: i32,
    axis: i32,
) -> Result<ValueId, BuildError> {
    let ctx = builder.context();
    let parts = usize::try_from(num).unwrap_or(0);
    let element = value_type(builder, x).and_then(|ty| {
        let tensor = ty.dyn_cast::<DenseTensorType>()?;
        let axis = usize::try_from(axis).ok().filter(|&a| a < tensor.rank())?;
        let mut dims = SmallVec::<[i64; 4]>::from_slice(tensor.dims());
        dims[axis] = match dims[axis] {
            d if d >= 0 && num > 0 && d % i64::from(num) == 0 => d / i64::from(num),
            _ => -1,
        };
        Some(DenseTensorType::get(ctx, tensor.dtype().clone(), &dims))
    });
    let result = element.map(|element| VectorType::get(ctx, vec![element; parts]));
    let argument = with_result(
        OperationArgument::new(SPLIT)
            .operand(x)
            .attribute("num", builder.int32_attr(num))
            .attribute("axis", builder.int32_attr(axis)),
        result,
    );
    builder.create_value(argument)
}

/// `pd.concat`: join the tensors of vector value `x` along `axis`.
pub fn concat(builder: &mut Builder<'_>, x: ValueId, axis: i32) -> Result<ValueId, BuildError> {
    let ctx = builder.context();
    let result = value_type(builder, x).and_then(|ty| {
        let first = ty.dyn_cast::<VectorType>()?.element(0)?.clone();
        let tensor = first.dyn_cast::<DenseTensorType>()?;
        let axis = usize::try_from(axis).ok().filter(|&a| a < tensor.rank())?;
        let mut dims = SmallVec::<[i64; 4]>::from_slice(tensor.dims());
        dims[axis] = -1;
        Some(DenseTensorType::get(ctx, tensor.dtype().clone(), &dims))
    });
    let argument = with_result(
        OperationArgument::new(CONCAT)
            .operand(x)
            .attribute("axis", builder.int32_attr(axis)),
        result,
    );
    builder.create_value(argument)
}
