//! Result binding for ops flagged `is_inplace`.
//!
//! The op signature maps output names to the inputs they overwrite. An
//! aliased result shares its input's variable name; any other result gets
//! the default rule.

use super::{OpRef, ScopeBuilder};
use crate::error::BindError;

impl ScopeBuilder<'_> {
    pub(super) fn bind_inplace(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let info = self
            .ctx
            .op_info(op.name)
            .ok_or_else(|| BindError::UnregisteredOp {
                op: op.name.to_owned(),
            })?;
        let signature = info.signature().ok_or_else(|| BindError::MissingSignature {
            op: op.name.to_owned(),
        })?;

        for (index, &result) in op.op.results().iter().enumerate() {
            let output = signature
                .output_name(index)
                .ok_or_else(|| BindError::MissingOutputInfo {
                    op: op.name.to_owned(),
                    index,
                })?;

            let Some(input) = signature.inplace_input(output) else {
                self.bind_value(op, result)?;
                continue;
            };
            let position = signature
                .input_index(input)
                .ok_or_else(|| BindError::UnknownInplaceInput {
                    op: op.name.to_owned(),
                    output: output.to_owned(),
                    input: input.to_owned(),
                })?;
            let operand = op.operand(position)?;
            let name = self.bound_name(op, position, operand)?.to_owned();
            tracing::trace!(op = op.name, output, input, var = %name, "inplace alias");
            self.tables.bind_if_absent(result, &name);
        }
        Ok(())
    }
}
