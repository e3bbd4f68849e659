//! Program arena: values, operations and blocks.
//!
//! All three live in flat vectors owned by a [`Program`] and are addressed by
//! `u32` newtype IDs. A value records its defining operation and result
//! index; an operation records its operands, results and attribute
//! dictionary; a block is an ordered list of operation IDs.
//!
//! Programs are built through [`Builder`](crate::Builder) and read by
//! everything downstream.

use smallvec::SmallVec;

use crate::attribute::{Attribute, AttributeMap, AttributeStorage};
use crate::kind::CastError;
use crate::types::Type;

// ── ID newtypes ─────────────────────────────────────────────────────

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            #[repr(transparent)]
            pub struct $name(u32);

            impl $name {
                /// Create an ID from a raw index.
                #[inline]
                pub fn new(raw: u32) -> Self {
                    Self(raw)
                }

                /// Get the raw `u32` value.
                #[inline]
                pub fn raw(self) -> u32 {
                    self.0
                }

                /// Get the index as `usize` (for indexing into `Vec`s).
                #[inline]
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

define_id! {
    /// SSA value ID within a [`Program`]. Each value is defined exactly once.
    ValueId,
    /// Operation ID within a [`Program`].
    OpId,
    /// Block ID within a [`Program`]. Block 0 is the entry block.
    BlockId,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "arena sizes never exceed u32"
)]
#[inline]
fn next_raw(len: usize) -> u32 {
    len as u32
}

// ── Arena entries ───────────────────────────────────────────────────

/// Per-value data.
#[derive(Clone, Debug)]
pub struct ValueData {
    ty: Option<Type>,
    def: OpId,
    index: usize,
}

impl ValueData {
    /// Declared logical type, `None` for untyped values.
    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    /// The operation that defines this value.
    pub fn defining_op(&self) -> OpId {
        self.def
    }

    /// Result position within the defining operation.
    pub fn result_index(&self) -> usize {
        self.index
    }
}

/// A node of the dataflow graph.
#[derive(Clone, Debug)]
pub struct Operation {
    name: String,
    operands: SmallVec<[ValueId; 4]>,
    results: SmallVec<[ValueId; 2]>,
    attributes: AttributeMap,
    block: Option<BlockId>,
}

impl Operation {
    /// Structural op name, e.g. `pd.relu`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> Option<ValueId> {
        self.operands.get(index).copied()
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn results(&self) -> &[ValueId] {
        &self.results
    }

    pub fn result(&self, index: usize) -> Option<ValueId> {
        self.results.get(index).copied()
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Look up attribute `name` and downcast it to kind `S`.
    ///
    /// `Ok(None)` means the attribute is absent; an attribute of another kind
    /// is an error.
    pub fn attribute_as<S: AttributeStorage>(&self, name: &str) -> Result<Option<&S>, CastError> {
        self.attributes
            .get(name)
            .map(Attribute::cast::<S>)
            .transpose()
    }

    /// The block this operation was inserted into, `None` if detached.
    pub fn parent_block(&self) -> Option<BlockId> {
        self.block
    }
}

/// Ordered list of operations.
#[derive(Clone, Debug, Default)]
pub struct Block {
    ops: Vec<OpId>,
}

impl Block {
    pub fn ops(&self) -> &[OpId] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// ── Program ─────────────────────────────────────────────────────────

/// Owner of every value, operation and block of one compiled graph.
#[derive(Clone, Debug)]
pub struct Program {
    ops: Vec<Operation>,
    values: Vec<ValueData>,
    blocks: Vec<Block>,
}

impl Program {
    /// Create a program with an empty entry block.
    pub fn new() -> Self {
        Program {
            ops: Vec::new(),
            values: Vec::new(),
            blocks: vec![Block::default()],
        }
    }

    #[inline]
    pub fn entry_block(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Allocate a new empty block.
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId::new(next_raw(self.blocks.len()));
        self.blocks.push(Block::default());
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// The operation with the given ID.
    ///
    /// # Panics
    /// Panics if `id` was not allocated by this program.
    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id.index()]
    }

    pub fn try_op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.index())
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    pub fn value(&self, id: ValueId) -> Option<&ValueData> {
        self.values.get(id.index())
    }

    pub fn contains_value(&self, id: ValueId) -> bool {
        id.index() < self.values.len()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Declared type of `id`, `None` if untyped or unknown.
    pub fn value_type(&self, id: ValueId) -> Option<&Type> {
        self.value(id)?.ty()
    }

    pub fn defining_op(&self, id: ValueId) -> Option<OpId> {
        self.value(id).map(ValueData::defining_op)
    }

    /// Operations of `block` in order. Empty for an unknown block.
    pub fn ops_in(&self, block: BlockId) -> impl Iterator<Item = (OpId, &Operation)> + '_ {
        self.block(block)
            .map(Block::ops)
            .unwrap_or_default()
            .iter()
            .map(move |&id| (id, self.op(id)))
    }

    /// Allocate an operation and its result values.
    ///
    /// The operation is not placed in any block; see `insert_op`.
    pub(crate) fn push_operation(
        &mut self,
        name: String,
        operands: SmallVec<[ValueId; 4]>,
        result_types: Vec<Option<Type>>,
        attributes: AttributeMap,
    ) -> OpId {
        let op = OpId::new(next_raw(self.ops.len()));
        let results = result_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                let value = ValueId::new(next_raw(self.values.len()));
                self.values.push(ValueData { ty, def: op, index });
                value
            })
            .collect();
        self.ops.push(Operation {
            name,
            operands,
            results,
            attributes,
            block: None,
        });
        op
    }

    /// Place `op` at position `index` of `block`.
    ///
    /// Callers validate `block` and `index` beforehand.
    pub(crate) fn insert_op(&mut self, block: BlockId, index: usize, op: OpId) {
        self.blocks[block.index()].ops.insert(index, op);
        self.ops[op.index()].block = Some(block);
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
