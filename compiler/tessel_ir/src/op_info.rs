//! Op registry entries and static op signatures.
//!
//! A signature lists an op's named inputs, attributes and outputs, plus the
//! in-place map from output name to the input it overwrites. The binder only
//! consumes the in-place map; the rest describes the op for builders and
//! diagnostics.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// A declared operand slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpInputInfo {
    pub name: String,
    pub optional: bool,
}

/// A declared result slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpOutputInfo {
    pub name: String,
}

/// A declared attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpAttributeInfo {
    pub name: String,
}

/// Static signature of an op.
///
/// Built with chained calls:
///
/// ```
/// use tessel_ir::OpSignature;
///
/// let sig = OpSignature::new()
///     .input("x")
///     .attribute("scale")
///     .output("out")
///     .inplace("out", "x");
/// assert_eq!(sig.inplace_input("out"), Some("x"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpSignature {
    inputs: Vec<OpInputInfo>,
    attributes: Vec<OpAttributeInfo>,
    outputs: Vec<OpOutputInfo>,
    /// Output name -> input name it aliases.
    inplace: FxHashMap<String, String>,
}

impl OpSignature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required input.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(OpInputInfo {
            name: name.into(),
            optional: false,
        });
        self
    }

    /// Declare an optional input.
    #[must_use]
    pub fn optional_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(OpInputInfo {
            name: name.into(),
            optional: true,
        });
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(OpAttributeInfo { name: name.into() });
        self
    }

    #[must_use]
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(OpOutputInfo { name: name.into() });
        self
    }

    /// Declare that `output` reuses the storage of `input`.
    #[must_use]
    pub fn inplace(mut self, output: impl Into<String>, input: impl Into<String>) -> Self {
        self.inplace.insert(output.into(), input.into());
        self
    }

    pub fn inputs(&self) -> &[OpInputInfo] {
        &self.inputs
    }

    pub fn attributes(&self) -> &[OpAttributeInfo] {
        &self.attributes
    }

    pub fn outputs(&self) -> &[OpOutputInfo] {
        &self.outputs
    }

    /// Output names in result order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|output| output.name.as_str())
    }

    /// Name of the output at result position `index`.
    pub fn output_name(&self, index: usize) -> Option<&str> {
        self.outputs.get(index).map(|output| output.name.as_str())
    }

    /// Operand position of the input called `name`.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|input| input.name == name)
    }

    /// The input that `output` overwrites, if any.
    pub fn inplace_input(&self, output: &str) -> Option<&str> {
        self.inplace.get(output).map(String::as_str)
    }

    pub fn has_inplace(&self, output: &str) -> bool {
        self.inplace.contains_key(output)
    }

    /// Returns `true` if any output aliases an input.
    pub fn is_inplace(&self) -> bool {
        !self.inplace.is_empty()
    }
}

/// Registry entry for one op name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpInfo {
    name: String,
    signature: Option<Arc<OpSignature>>,
}

impl OpInfo {
    /// An op without a static signature.
    pub fn new(name: impl Into<String>) -> Self {
        OpInfo {
            name: name.into(),
            signature: None,
        }
    }

    pub fn with_signature(name: impl Into<String>, signature: OpSignature) -> Self {
        OpInfo {
            name: name.into(),
            signature: Some(Arc::new(signature)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> Option<&Arc<OpSignature>> {
        self.signature.as_ref()
    }

    /// Dialect prefix of the name (`pd.relu` -> `pd`).
    pub fn dialect(&self) -> &str {
        self.name
            .split_once('.')
            .map_or("", |(dialect, _)| dialect)
    }
}
