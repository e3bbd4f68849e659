//! Binding rules of the special forms.

use tessel_ir::attribute::names;
use tessel_ir::Int32Attribute;

use super::{OpRef, ScopeBuilder};
use crate::error::BindError;
use crate::feed_fetch::{FEED_VAR, FETCH_VAR};
use crate::variable::FeedItem;

impl ScopeBuilder<'_> {
    /// Column attribute of a feed or fetch op.
    fn column(op: &OpRef<'_>) -> Result<usize, BindError> {
        let col = op.required_attr::<Int32Attribute>(names::COL)?.data();
        usize::try_from(col).map_err(|_| BindError::InvalidColumn {
            op: op.name.to_owned(),
            col,
        })
    }

    /// `pd.fetch`: make sure the root fetch list has room for `col`.
    pub(super) fn bind_fetch(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let col = Self::column(op)?;
        let var = self.scopes.create(self.root, FETCH_VAR)?;
        let slots = self.scopes.var_mut(var)?.get_mutable_fetch_list()?;
        if slots.len() <= col {
            slots.resize(col + 1, None);
        }
        tracing::trace!(col, len = slots.len(), "reserved fetch slot");
        Ok(())
    }

    /// `pd.feed`: the result's variable shares the tensor at feed column `col`.
    ///
    /// A result already bound in these tables keeps its variable.
    pub(super) fn bind_feed(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let col = Self::column(op)?;
        let result = op.result(0)?;
        let var = self.lookup_or_create(op, result)?;

        let feed = self
            .scopes
            .find_local(self.root, FEED_VAR)
            .ok_or(BindError::FeedMissing)?;
        let items = self.scopes.var(feed)?.feed_list()?;
        let source = match items.get(col) {
            Some(FeedItem::Tensor(tensor)) => tensor.clone(),
            Some(FeedItem::Strings(_)) => return Err(BindError::FeedItemNotTensor { col }),
            None => {
                return Err(BindError::FeedColumnOutOfRange {
                    col,
                    len: items.len(),
                })
            }
        };

        let out = self.scopes.var_mut(var)?.get_mutable_dense_tensor()?;
        out.share_data_with(&source);
        out.set_lod(source.lod().clone());
        Ok(())
    }

    /// `builtin.combine`: a reference list of the operands' variables.
    pub(super) fn bind_combine(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let result = op.result(0)?;
        let mut members = Vec::with_capacity(op.op.num_operands());
        for (index, &value) in op.op.operands().iter().enumerate() {
            let name = self.bound_name(op, index, value)?;
            let var = self
                .scopes
                .find(self.scope, name)
                .ok_or_else(|| BindError::UnresolvedBinding {
                    value,
                    name: name.to_owned(),
                })?;
            members.push(var);
        }

        let var = self.lookup_or_create(op, result)?;
        let list = self.scopes.var_mut(var)?.get_mutable_ref_array()?;
        list.clear();
        list.extend(members);
        Ok(())
    }

    /// `builtin.set_parameter`: publish the operand's variable in the root
    /// under `parameter_name`, unless the root already has one.
    pub(super) fn bind_set_parameter(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let parameter = Self::string_attr(op, names::PARAMETER_NAME)?;
        let value = op.operand(0)?;
        let current = self.bound_name(op, 0, value)?.to_owned();

        if self.scopes.find_local(self.root, parameter).is_none() {
            let var = self
                .scopes
                .rename_into(self.root, self.scope, &current, parameter)?;
            self.tables.rename_variable(var, &current, parameter);
            tracing::trace!(from = %current, to = parameter, "published parameter");
        }
        self.tables.rebind(value, parameter);
        Ok(())
    }

    /// `builtin.get_parameter`: bind the result to `parameter_name` without
    /// creating a variable.
    pub(super) fn bind_get_parameter(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let parameter = Self::string_attr(op, names::PARAMETER_NAME)?;
        let result = op.result(0)?;
        self.tables.bind_if_absent(result, parameter);
        Ok(())
    }

    /// `builtin.slice`: alias the result to element `index` of the operand's
    /// reference list.
    pub(super) fn bind_slice(&mut self, op: &OpRef<'_>) -> Result<(), BindError> {
        let input = op.operand(0)?;
        let name = self.bound_name(op, 0, input)?;
        let index = op.required_attr::<Int32Attribute>(names::INDEX)?.data();
        let result = op.result(0)?;

        let list_var = self
            .scopes
            .find(self.scope, name)
            .ok_or_else(|| BindError::UnresolvedBinding {
                value: input,
                name: name.to_owned(),
            })?;
        let list = self.scopes.var(list_var)?.ref_array()?;
        let element = usize::try_from(index)
            .ok()
            .and_then(|i| list.get(i).map(|&var| (i, var)));
        let Some((position, element)) = element else {
            return Err(BindError::SliceOutOfRange {
                op: op.name.to_owned(),
                index,
                len: list.len(),
            });
        };

        let element_name = self
            .tables
            .variable_name(element)
            .ok_or_else(|| BindError::UnresolvedSliceElement {
                op: op.name.to_owned(),
                index: position,
            })?
            .to_owned();
        self.tables.bind_if_absent(result, &element_name);
        Ok(())
    }
}
