//! Binding tables.
//!
//! One [`BindingTables`] instance accumulates the result of a binder run:
//!
//! - value -> name: which variable holds each value (many values may share a
//!   name),
//! - variable -> name: inverse lookup by variable identity,
//! - name -> ordinal: dense creation number of each created variable,
//! - variable list: created variables in creation order.
//!
//! The variable list and the ordinal table always have the same length.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tessel_ir::ValueId;

use crate::error::BindError;
use crate::scope::{ScopeId, ScopeTree};
use crate::variable::VarId;

#[derive(Clone, Debug, Default)]
pub struct BindingTables {
    value_to_name: FxHashMap<ValueId, String>,
    variable_to_name: FxHashMap<VarId, String>,
    name_to_id: BTreeMap<String, usize>,
    variables: Vec<VarId>,
}

impl BindingTables {
    pub fn new() -> Self {
        Self::default()
    }

    // Value bindings

    pub fn value_name(&self, value: ValueId) -> Option<&str> {
        self.value_to_name.get(&value).map(String::as_str)
    }

    pub fn is_bound(&self, value: ValueId) -> bool {
        self.value_to_name.contains_key(&value)
    }

    /// Bind `value` to `name` unless it is already bound.
    ///
    /// Returns `false` if an earlier binding was kept.
    pub fn bind_if_absent(&mut self, value: ValueId, name: &str) -> bool {
        if self.value_to_name.contains_key(&value) {
            return false;
        }
        self.value_to_name.insert(value, name.to_owned());
        true
    }

    /// Bind `value` to `name`, replacing any earlier binding.
    pub fn rebind(&mut self, value: ValueId, name: &str) {
        self.value_to_name.insert(value, name.to_owned());
    }

    pub fn value_to_name(&self) -> &FxHashMap<ValueId, String> {
        &self.value_to_name
    }

    // Created variables

    /// Name recorded for `var` when this binder created it.
    pub fn variable_name(&self, var: VarId) -> Option<&str> {
        self.variable_to_name.get(&var).map(String::as_str)
    }

    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.name_to_id.get(name).copied()
    }

    pub fn name_to_id(&self) -> &BTreeMap<String, usize> {
        &self.name_to_id
    }

    /// Created variables in creation order.
    pub fn variables(&self) -> &[VarId] {
        &self.variables
    }

    /// Number of variables created so far.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Creation number of the next variable.
    pub fn next_var_number(&self) -> usize {
        self.variable_to_name.len()
    }

    /// Record a newly created variable in every table.
    ///
    /// `value` is bound only if it has no binding yet. Returns the ordinal
    /// assigned to `name`.
    pub fn record(
        &mut self,
        value: Option<ValueId>,
        var: VarId,
        name: &str,
    ) -> Result<usize, BindError> {
        if let Some(value) = value {
            self.bind_if_absent(value, name);
        }
        self.variable_to_name.insert(var, name.to_owned());
        let ordinal = self.name_to_id.len();
        self.name_to_id.insert(name.to_owned(), ordinal);
        self.variables.push(var);
        self.check_sizes()?;
        Ok(ordinal)
    }

    /// Follow a scope rename of `var` from `old` to `new`.
    ///
    /// The variable keeps its ordinal, and every value bound to `old` is
    /// re-pointed at `new`.
    pub fn rename_variable(&mut self, var: VarId, old: &str, new: &str) {
        if let Some(name) = self.variable_to_name.get_mut(&var) {
            new.clone_into(name);
        }
        if let Some(ordinal) = self.name_to_id.remove(old) {
            self.name_to_id.insert(new.to_owned(), ordinal);
        }
        for name in self.value_to_name.values_mut() {
            if name == old {
                new.clone_into(name);
            }
        }
    }

    fn check_sizes(&self) -> Result<(), BindError> {
        if self.variables.len() != self.name_to_id.len()
            || self.variables.len() != self.variable_to_name.len()
        {
            return Err(BindError::TableSizeMismatch {
                variables: self.variables.len(),
                ordinals: self.name_to_id.len(),
                names: self.variable_to_name.len(),
            });
        }
        Ok(())
    }

    /// Check the table invariants against `scopes`.
    ///
    /// All three variable tables must have the same size, and every bound
    /// name must be visible from `scope`.
    pub fn verify(&self, scopes: &ScopeTree, scope: ScopeId) -> Result<(), BindError> {
        self.check_sizes()?;
        let mut bindings: Vec<_> = self.value_to_name.iter().collect();
        bindings.sort_unstable_by_key(|(value, _)| **value);
        for (&value, name) in bindings {
            if scopes.find(scope, name).is_none() {
                return Err(BindError::UnresolvedBinding {
                    value,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}
