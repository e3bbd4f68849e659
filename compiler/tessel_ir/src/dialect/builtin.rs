//! The `builtin` dialect: scalar and vector types, the builtin attribute
//! kinds, and the list and parameter pseudo-ops.

use crate::attribute::{names, register_builtin_attributes};
use crate::builder::{BuildError, Builder, OperationArgument};
use crate::context::{ContextError, IrContext};
use crate::op_info::{OpInfo, OpSignature};
use crate::program::{OpId, ValueId};
use crate::types::{register_scalar_types, Type, VectorType};

use super::Dialect;

/// Pack operands into one vector-typed value.
pub const COMBINE: &str = "builtin.combine";
/// Extract one element of a vector-typed value.
pub const SLICE: &str = "builtin.slice";
/// Read a named parameter.
pub const GET_PARAMETER: &str = "builtin.get_parameter";
/// Publish a value as a named parameter.
pub const SET_PARAMETER: &str = "builtin.set_parameter";

#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinDialect;

impl Dialect for BuiltinDialect {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn initialize(&self, ctx: &IrContext) -> Result<(), ContextError> {
        let storage = ctx.storage();
        register_scalar_types(storage)?;
        storage.register_parametric::<VectorType>()?;
        register_builtin_attributes(storage)?;

        ctx.register_op(OpInfo::with_signature(
            COMBINE,
            OpSignature::new().input("inputs").output("out"),
        ))?;
        ctx.register_op(OpInfo::with_signature(
            SLICE,
            OpSignature::new()
                .input("input")
                .attribute(names::INDEX)
                .output("out"),
        ))?;
        ctx.register_op(OpInfo::with_signature(
            GET_PARAMETER,
            OpSignature::new()
                .attribute(names::PARAMETER_NAME)
                .output("out"),
        ))?;
        ctx.register_op(OpInfo::with_signature(
            SET_PARAMETER,
            OpSignature::new()
                .input("parameter")
                .attribute(names::PARAMETER_NAME),
        ))?;
        Ok(())
    }
}

/// `builtin.combine`: the result type is a vector of the input types, or
/// untyped if any input is untyped.
pub fn combine(builder: &mut Builder<'_>, inputs: &[ValueId]) -> Result<ValueId, BuildError> {
    let program = builder.program();
    let elements: Option<Vec<Type>> = inputs
        .iter()
        .map(|&value| program.value_type(value).cloned())
        .collect();
    let argument = OperationArgument::new(COMBINE).operands(inputs.iter().copied());
    let argument = match elements {
        Some(elements) => argument.result(builder.vec_type(elements)),
        None => argument.untyped_result(),
    };
    builder.create_value(argument)
}

/// `builtin.slice`: element `index` of a vector value.
pub fn slice(builder: &mut Builder<'_>, input: ValueId, index: i32) -> Result<ValueId, BuildError> {
    let element = usize::try_from(index).ok().and_then(|i| {
        builder
            .program()
            .value_type(input)?
            .dyn_cast::<VectorType>()?
            .element(i)
            .cloned()
    });
    let argument = OperationArgument::new(SLICE)
        .operand(input)
        .attribute(names::INDEX, builder.int32_attr(index));
    let argument = match element {
        Some(ty) => argument.result(ty),
        None => argument.untyped_result(),
    };
    builder.create_value(argument)
}

/// `builtin.get_parameter`: a value backed by the parameter `name`.
pub fn get_parameter(
    builder: &mut Builder<'_>,
    name: &str,
    ty: Type,
) -> Result<ValueId, BuildError> {
    let argument = OperationArgument::new(GET_PARAMETER)
        .attribute(names::PARAMETER_NAME, builder.str_attr(name))
        .result(ty);
    builder.create_value(argument)
}

/// `builtin.set_parameter`: publish `value` under `name`.
pub fn set_parameter(
    builder: &mut Builder<'_>,
    value: ValueId,
    name: &str,
) -> Result<OpId, BuildError> {
    let argument = OperationArgument::new(SET_PARAMETER)
        .operand(value)
        .attribute(names::PARAMETER_NAME, builder.str_attr(name));
    builder.create(argument)
}
