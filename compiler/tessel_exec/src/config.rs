//! Binder configuration.

/// Default prefix of synthetic variable names.
pub const DEFAULT_VAR_PREFIX: &str = "inner_var_";

/// Knobs for one [`build_scope`](crate::build_scope) call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindConfig {
    /// Synthetic names are `{var_prefix}{n}`.
    pub var_prefix: String,
    /// Create every new variable in the root scope.
    pub force_persistable: bool,
}

impl BindConfig {
    #[must_use]
    pub fn with_var_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.var_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_force_persistable(mut self, force: bool) -> Self {
        self.force_persistable = force;
        self
    }

    /// Synthetic name for the variable with creation number `n`.
    pub fn var_name(&self, n: usize) -> String {
        format!("{}{n}", self.var_prefix)
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        BindConfig {
            var_prefix: DEFAULT_VAR_PREFIX.to_owned(),
            force_persistable: false,
        }
    }
}
