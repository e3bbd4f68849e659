//! Hierarchical runtime scopes.
//!
//! A [`ScopeTree`] is an arena of scopes and variables. Scope 0 is the root
//! and holds persistent variables; every other scope has a parent and holds
//! transient ones. Lookups walk from a scope up through its ancestors.
//!
//! Variables are addressed by [`VarId`]. Moving a variable between scopes or
//! renaming it keeps its `VarId`, so tables keyed by identity stay valid.
//! Dropping a scope frees its variables and every descendant scope.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::variable::{VarId, Variable};

/// Identity of a scope inside a [`ScopeTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Error raised by scope operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("{scope} does not exist")]
    UnknownScope { scope: ScopeId },
    #[error("variable {var:?} does not exist")]
    UnknownVariable { var: VarId },
    #[error("no variable named `{name}` is visible from {scope}")]
    NotFound { scope: ScopeId, name: String },
    #[error("{scope} already holds a variable named `{name}`")]
    NameTaken { scope: ScopeId, name: String },
    #[error("the root scope cannot be dropped")]
    RootScope,
}

#[derive(Debug)]
struct ScopeData {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    vars: FxHashMap<String, VarId>,
}

#[derive(Debug)]
struct VarSlot {
    name: String,
    scope: ScopeId,
    variable: Variable,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "scope and variable counts never exceed u32"
)]
#[inline]
fn next_raw(len: usize) -> u32 {
    len as u32
}

/// Arena of scopes and the variables they own.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Option<ScopeData>>,
    vars: Vec<Option<VarSlot>>,
}

impl ScopeTree {
    /// A tree holding only an empty root scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Some(ScopeData {
                parent: None,
                children: Vec::new(),
                vars: FxHashMap::default(),
            })],
            vars: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> ScopeId {
        ScopeId::new(0)
    }

    fn scope(&self, scope: ScopeId) -> Result<&ScopeData, ScopeError> {
        self.scopes
            .get(scope.index())
            .and_then(Option::as_ref)
            .ok_or(ScopeError::UnknownScope { scope })
    }

    fn scope_mut(&mut self, scope: ScopeId) -> Result<&mut ScopeData, ScopeError> {
        self.scopes
            .get_mut(scope.index())
            .and_then(Option::as_mut)
            .ok_or(ScopeError::UnknownScope { scope })
    }

    fn slot(&self, var: VarId) -> Result<&VarSlot, ScopeError> {
        self.vars
            .get(var.index())
            .and_then(Option::as_ref)
            .ok_or(ScopeError::UnknownVariable { var })
    }

    pub fn contains_scope(&self, scope: ScopeId) -> bool {
        self.scope(scope).is_ok()
    }

    pub fn parent(&self, scope: ScopeId) -> Result<Option<ScopeId>, ScopeError> {
        Ok(self.scope(scope)?.parent)
    }

    /// The root reachable from `scope`.
    pub fn root_of(&self, scope: ScopeId) -> Result<ScopeId, ScopeError> {
        let mut current = scope;
        while let Some(parent) = self.scope(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// Create an empty child scope of `parent`.
    pub fn new_scope(&mut self, parent: ScopeId) -> Result<ScopeId, ScopeError> {
        let id = ScopeId::new(next_raw(self.scopes.len()));
        self.scope_mut(parent)?.children.push(id);
        self.scopes.push(Some(ScopeData {
            parent: Some(parent),
            children: Vec::new(),
            vars: FxHashMap::default(),
        }));
        Ok(id)
    }

    /// Free `scope`, its descendants, and every variable they own.
    ///
    /// Variables that were moved out of the scope beforehand survive.
    pub fn drop_scope(&mut self, scope: ScopeId) -> Result<(), ScopeError> {
        let parent = self.scope(scope)?.parent.ok_or(ScopeError::RootScope)?;
        self.scope_mut(parent)?.children.retain(|&child| child != scope);

        let mut pending = vec![scope];
        while let Some(current) = pending.pop() {
            let Some(data) = self.scopes[current.index()].take() else {
                continue;
            };
            for var in data.vars.into_values() {
                self.vars[var.index()] = None;
            }
            pending.extend(data.children);
        }
        tracing::trace!(%scope, "dropped scope");
        Ok(())
    }

    /// Find `name` in `scope` or its ancestors.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.scope(id).ok()?;
            if let Some(&var) = data.vars.get(name) {
                return Some(var);
            }
            current = data.parent;
        }
        None
    }

    /// Find `name` in `scope` only.
    pub fn find_local(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        self.scope(scope).ok()?.vars.get(name).copied()
    }

    /// Find `name` in `scope`, creating an empty variable there if absent.
    pub fn create(&mut self, scope: ScopeId, name: &str) -> Result<VarId, ScopeError> {
        if let Some(var) = self.scope(scope)?.vars.get(name) {
            return Ok(*var);
        }
        let var = VarId::new(next_raw(self.vars.len()));
        self.vars.push(Some(VarSlot {
            name: name.to_owned(),
            scope,
            variable: Variable::new(),
        }));
        self.scope_mut(scope)?.vars.insert(name.to_owned(), var);
        Ok(var)
    }

    /// Rename the variable `old` of `scope` to `new`, within `scope`.
    pub fn rename(&mut self, scope: ScopeId, old: &str, new: &str) -> Result<VarId, ScopeError> {
        let var = self.find_local(scope, old).ok_or_else(|| ScopeError::NotFound {
            scope,
            name: old.to_owned(),
        })?;
        self.rename_into(scope, scope, old, new)?;
        Ok(var)
    }

    /// Move the variable `old`, as seen from `from`, into `target` under `new`.
    ///
    /// `old` is resolved through `from` and its ancestors. The variable keeps
    /// its identity and payload. Renaming a variable to its current name in
    /// its current scope is a no-op.
    pub fn rename_into(
        &mut self,
        target: ScopeId,
        from: ScopeId,
        old: &str,
        new: &str,
    ) -> Result<VarId, ScopeError> {
        self.scope(target)?;
        let var = self.find(from, old).ok_or_else(|| ScopeError::NotFound {
            scope: from,
            name: old.to_owned(),
        })?;
        let owner = self.slot(var)?.scope;
        if owner == target && old == new {
            return Ok(var);
        }
        if self.find_local(target, new).is_some() {
            return Err(ScopeError::NameTaken {
                scope: target,
                name: new.to_owned(),
            });
        }

        self.scope_mut(owner)?.vars.remove(old);
        self.scope_mut(target)?.vars.insert(new.to_owned(), var);
        if let Some(slot) = self.vars[var.index()].as_mut() {
            slot.name = new.to_owned();
            slot.scope = target;
        }
        tracing::trace!(old, new, from = %owner, to = %target, "renamed variable");
        Ok(var)
    }

    pub fn var(&self, var: VarId) -> Result<&Variable, ScopeError> {
        Ok(&self.slot(var)?.variable)
    }

    pub fn var_mut(&mut self, var: VarId) -> Result<&mut Variable, ScopeError> {
        self.vars
            .get_mut(var.index())
            .and_then(Option::as_mut)
            .map(|slot| &mut slot.variable)
            .ok_or(ScopeError::UnknownVariable { var })
    }

    /// Current name of `var`.
    pub fn name_of(&self, var: VarId) -> Option<&str> {
        self.slot(var).ok().map(|slot| slot.name.as_str())
    }

    /// Scope currently owning `var`.
    pub fn scope_of(&self, var: VarId) -> Option<ScopeId> {
        self.slot(var).ok().map(|slot| slot.scope)
    }

    /// Names of the variables owned by `scope`, sorted.
    pub fn local_names(&self, scope: ScopeId) -> Result<Vec<&str>, ScopeError> {
        let mut names: Vec<&str> = self.scope(scope)?.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Number of live variables across all scopes.
    pub fn num_vars(&self) -> usize {
        self.vars.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
