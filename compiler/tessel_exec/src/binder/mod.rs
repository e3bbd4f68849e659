//! Scope binder.
//!
//! [`build_scope`] walks one block of a [`Program`] in order and makes sure
//! every operand is bound to a runtime variable and every result gets one.
//! Each op is classified once into a [`BindRule`]:
//!
//! - the six special forms (`pd.feed`, `pd.fetch`, `builtin.combine`,
//!   `builtin.set_parameter`, `builtin.get_parameter`, `builtin.slice`) have
//!   their own rules, see `special.rs`,
//! - ops flagged `is_inplace` bind aliased results to their input's
//!   variable, see `inplace.rs`,
//! - everything else gets the default rule: one fresh variable per result,
//!   with a payload chosen from the result type.
//!
//! Synthetic names are `{prefix}{n}` where `n` is the number of variables
//! created so far, so binding the same block into fresh tables always
//! produces the same names in the same order.
//!
//! # Scopes
//! New variables go into the transient scope passed by the caller, or into
//! its root when the defining op has `is_persistable = true` or the config
//! forces it. `feed` and `fetch` always live in the root.

mod inplace;
mod special;

use tessel_ir::attribute::names;
use tessel_ir::dialect::{builtin, tensor};
use tessel_ir::{
    AttributeStorage, BlockId, BoolAttribute, DenseTensorType, IrContext, OpId,
    Operation, Program, StrAttribute, ValueId, VectorType,
};

use crate::config::BindConfig;
use crate::error::BindError;
use crate::scope::{ScopeId, ScopeTree};
use crate::tables::BindingTables;
use crate::variable::VarId;

/// How the binder treats one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindRule {
    Feed,
    Fetch,
    Combine,
    SetParameter,
    GetParameter,
    Slice,
    Regular,
}

impl BindRule {
    /// Classify an effective op name.
    pub fn classify(name: &str) -> Self {
        match name {
            tensor::FEED => BindRule::Feed,
            tensor::FETCH => BindRule::Fetch,
            builtin::COMBINE => BindRule::Combine,
            builtin::SET_PARAMETER => BindRule::SetParameter,
            builtin::GET_PARAMETER => BindRule::GetParameter,
            builtin::SLICE => BindRule::Slice,
            _ => BindRule::Regular,
        }
    }

    pub fn is_special(self) -> bool {
        !matches!(self, BindRule::Regular)
    }
}

/// Bind every operation of `block`.
///
/// `scope` is the transient scope; its root holds persistent variables.
/// `tables` may already hold bindings from earlier blocks.
pub fn build_scope(
    ctx: &IrContext,
    program: &Program,
    block: BlockId,
    scopes: &mut ScopeTree,
    scope: ScopeId,
    tables: &mut BindingTables,
    config: &BindConfig,
) -> Result<(), BindError> {
    let span = tracing::debug_span!("build_scope", ?block, %scope);
    let _guard = span.enter();

    let root = scopes.root_of(scope)?;
    let mut binder = ScopeBuilder {
        ctx,
        program,
        scopes,
        scope,
        root,
        tables,
        config,
    };
    for (id, op) in program.ops_in(block) {
        binder.bind_op(id, op)?;
    }

    tracing::debug!(
        variables = binder.tables.len(),
        bindings = binder.tables.value_to_name().len(),
        "scope built"
    );
    Ok(())
}

/// State of one binder run.
pub(crate) struct ScopeBuilder<'a> {
    ctx: &'a IrContext,
    program: &'a Program,
    scopes: &'a mut ScopeTree,
    scope: ScopeId,
    root: ScopeId,
    tables: &'a mut BindingTables,
    config: &'a BindConfig,
}

/// Per-op context handed to the rule handlers.
pub(crate) struct OpRef<'p> {
    pub op: &'p Operation,
    /// Effective name: the `op_name` attribute if present.
    pub name: &'p str,
}

impl OpRef<'_> {
    pub fn attr<S: AttributeStorage>(&self, name: &'static str) -> Result<Option<&S>, BindError> {
        self.op
            .attribute_as::<S>(name)
            .map_err(|source| BindError::AttributeType {
                op: self.name.to_owned(),
                name,
                source,
            })
    }

    pub fn required_attr<S: AttributeStorage>(&self, name: &'static str) -> Result<&S, BindError> {
        self.attr::<S>(name)?.ok_or_else(|| BindError::MissingAttribute {
            op: self.name.to_owned(),
            name,
        })
    }

    pub fn flag(&self, name: &'static str) -> Result<bool, BindError> {
        Ok(self.attr::<BoolAttribute>(name)?.is_some_and(BoolAttribute::data))
    }

    pub fn operand(&self, index: usize) -> Result<ValueId, BindError> {
        self.op.operand(index).ok_or_else(|| BindError::MissingOperand {
            op: self.name.to_owned(),
            index,
        })
    }

    pub fn result(&self, index: usize) -> Result<ValueId, BindError> {
        self.op.result(index).ok_or_else(|| BindError::MissingResult {
            op: self.name.to_owned(),
            index,
        })
    }
}

/// The `op_name` override, else the structural name.
fn effective_name(op: &Operation) -> Result<&str, BindError> {
    match op.attribute(names::OP_NAME) {
        None => Ok(op.name()),
        Some(attr) => attr
            .cast::<StrAttribute>()
            .map(StrAttribute::data)
            .map_err(|source| BindError::AttributeType {
                op: op.name().to_owned(),
                name: names::OP_NAME,
                source,
            }),
    }
}

impl ScopeBuilder<'_> {
    fn bind_op(&mut self, id: OpId, op: &Operation) -> Result<(), BindError> {
        let name = effective_name(op)?;
        let op = OpRef { op, name };
        let rule = BindRule::classify(name);
        tracing::trace!(?id, op = name, ?rule, "binding op");

        match rule {
            BindRule::Feed => self.bind_feed(&op),
            BindRule::Fetch => self.bind_fetch(&op),
            BindRule::Combine => self.bind_combine(&op),
            BindRule::SetParameter => self.bind_set_parameter(&op),
            BindRule::GetParameter => self.bind_get_parameter(&op),
            BindRule::Slice => self.bind_slice(&op),
            BindRule::Regular => self.bind_regular(&op),
        }
    }

    fn bind_regular(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        for (index, &value) in op.op.operands().iter().enumerate() {
            self.bound_name(op, index, value)?;
        }
        if op.op.num_results() == 0 {
            return Ok(());
        }
        if op.flag(names::IS_INPLACE)? {
            return self.bind_inplace(op);
        }
        for &result in op.op.results() {
            self.bind_value(op, result)?;
        }
        Ok(())
    }

    fn bound_name(&self, op: &OpRef<'_>, index: usize, value: ValueId) -> Result<&str, BindError> {
        self.tables
            .value_name(value)
            .ok_or_else(|| BindError::UnboundOperand {
                op: op.name.to_owned(),
                index,
            })
    }

    /// Resolve the variable currently bound to `value`, if any.
    fn lookup(&self, value: ValueId) -> Result<Option<VarId>, BindError> {
        let Some(name) = self.tables.value_name(value) else {
            return Ok(None);
        };
        self.scopes
            .find(self.scope, name)
            .map(Some)
            .ok_or_else(|| BindError::UnresolvedBinding {
                value,
                name: name.to_owned(),
            })
    }

    /// Whether variables defined by `op` belong in the root scope.
    fn is_persistable(&self, op: &OpRef<'_>) -> Result<bool, BindError> {
        Ok(self.config.force_persistable || op.flag(names::IS_PERSISTABLE)?)
    }

    /// Create a variable named `{prefix}{n}` and record it in every table.
    fn create_variable(
        &mut self,
        op: &OpRef<'_>,
        value: Option<ValueId>,
    ) -> Result<VarId, BindError> {
        let target = if self.is_persistable(op)? {
            self.root
        } else {
            self.scope
        };
        let name = self.config.var_name(self.tables.next_var_number());
        let var = self.scopes.create(target, &name)?;
        let ordinal = self.tables.record(value, var, &name)?;
        tracing::trace!(%name, ordinal, scope = %target, "created variable");
        Ok(var)
    }

    /// Existing variable of `value`, or a new one.
    fn lookup_or_create(&mut self, op: &OpRef<'_>, value: ValueId) -> Result<VarId, BindError> {
        match self.lookup(value)? {
            Some(var) => Ok(var),
            None => self.create_variable(op, Some(value)),
        }
    }

    /// Default rule: bind `value` and give its variable a payload matching
    /// the value's type.
    pub(crate) fn bind_value(&mut self, op: &OpRef<'_>, value: ValueId) -> Result<(), BindError> {
        let ty = self.program.value_type(value);
        let elements = match ty {
            None => {
                // Untyped results fall back to a dense tensor.
                tracing::trace!(?value, op = op.name, "untyped value bound as dense tensor");
                None
            }
            Some(ty) if ty.isa::<DenseTensorType>() => None,
            Some(ty) => match ty.dyn_cast::<VectorType>() {
                Some(vector) => Some(self.check_vector(op, vector)?),
                None => {
                    return Err(BindError::UnsupportedOutputType {
                        op: op.name.to_owned(),
                        ty: ty.to_string(),
                    })
                }
            },
        };

        let rebinding = self.tables.is_bound(value);
        let var = self.lookup_or_create(op, value)?;
        let Some(len) = elements else {
            self.scopes.var_mut(var)?.get_mutable_dense_tensor()?;
            return Ok(());
        };

        // Elements named by these tables stay. A list reached through
        // find-or-create may hold elements of an earlier run; replace them.
        if rebinding && !self.scopes.var_mut(var)?.get_mutable_ref_array()?.is_empty() {
            return Ok(());
        }
        let mut children = Vec::with_capacity(len);
        for _ in 0..len {
            let child = self.create_variable(op, None)?;
            self.scopes.var_mut(child)?.get_mutable_dense_tensor()?;
            children.push(child);
        }
        *self.scopes.var_mut(var)?.get_mutable_ref_array()? = children;
        Ok(())
    }

    /// Every element of a vector result must be a dense tensor.
    fn check_vector(&self, op: &OpRef<'_>, vector: &VectorType) -> Result<usize, BindError> {
        if let Some((index, element)) = vector
            .elements()
            .iter()
            .enumerate()
            .find(|(_, element)| !element.isa::<DenseTensorType>())
        {
            return Err(BindError::UnsupportedNestedList {
                op: op.name.to_owned(),
                index,
                ty: element.to_string(),
            });
        }
        Ok(vector.len())
    }

    fn string_attr<'o>(op: &'o OpRef<'_>, name: &'static str) -> Result<&'o str, BindError> {
        Ok(op.required_attr::<StrAttribute>(name)?.data())
    }
}

#[cfg(test)]
mod tests;
