//! Op builder.
//!
//! [`Builder`] creates operations in a [`Program`] and inserts them at a
//! cursor. The cursor is a `(block, index)` pair; after every insertion it
//! advances past the new operation, so consecutive `create` calls keep
//! program order. A builder without a cursor still allocates operations but
//! leaves them outside every block.
//!
//! The builder is also the usual producer of interned objects: the type and
//! attribute helpers forward to the context's interning store.

use smallvec::SmallVec;

use crate::attribute::{
    ArrayAttribute, Attribute, AttributeMap, BoolAttribute, DoubleAttribute, FloatAttribute,
    Int32Attribute, Int64Attribute, StrAttribute,
};
use crate::context::IrContext;
use crate::program::{BlockId, OpId, Program, ValueId};
use crate::types::{BoolType, Float32Type, Float64Type, Int32Type, Int64Type, Type, VectorType};

/// Error raised while creating an operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("op `{name}` is not registered with the context")]
    UnregisteredOp { name: String },
    #[error("operand {index} of `{op}` refers to unknown value {value:?}")]
    UnknownValue {
        op: String,
        index: usize,
        value: ValueId,
    },
    #[error("block {block:?} does not exist")]
    UnknownBlock { block: BlockId },
    #[error("insertion index {index} is out of range for block {block:?} of length {len}")]
    InsertOutOfRange {
        block: BlockId,
        index: usize,
        len: usize,
    },
    #[error("`{op}` was expected to produce a result")]
    NoResult { op: String },
}

/// Everything needed to create one operation.
#[derive(Clone, Debug)]
pub struct OperationArgument {
    name: String,
    operands: SmallVec<[ValueId; 4]>,
    result_types: Vec<Option<Type>>,
    attributes: AttributeMap,
}

impl OperationArgument {
    pub fn new(name: impl Into<String>) -> Self {
        OperationArgument {
            name: name.into(),
            operands: SmallVec::new(),
            result_types: Vec::new(),
            attributes: AttributeMap::new(),
        }
    }

    #[must_use]
    pub fn operand(mut self, value: ValueId) -> Self {
        self.operands.push(value);
        self
    }

    #[must_use]
    pub fn operands(mut self, values: impl IntoIterator<Item = ValueId>) -> Self {
        self.operands.extend(values);
        self
    }

    /// Add a typed result.
    #[must_use]
    pub fn result(mut self, ty: Type) -> Self {
        self.result_types.push(Some(ty));
        self
    }

    /// Add a result without a declared type.
    #[must_use]
    pub fn untyped_result(mut self) -> Self {
        self.result_types.push(None);
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: Attribute) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cursor {
    block: BlockId,
    index: usize,
}

/// Creates operations and inserts them at a cursor.
pub struct Builder<'a> {
    ctx: &'a IrContext,
    program: &'a mut Program,
    cursor: Option<Cursor>,
}

impl<'a> Builder<'a> {
    /// A builder positioned at the end of the entry block.
    pub fn new(ctx: &'a IrContext, program: &'a mut Program) -> Self {
        let block = program.entry_block();
        let index = program.block(block).map_or(0, |b| b.len());
        Builder {
            ctx,
            program,
            cursor: Some(Cursor { block, index }),
        }
    }

    /// A builder without an insertion point.
    pub fn detached(ctx: &'a IrContext, program: &'a mut Program) -> Self {
        Builder {
            ctx,
            program,
            cursor: None,
        }
    }

    pub fn context(&self) -> &'a IrContext {
        self.ctx
    }

    pub fn program(&self) -> &Program {
        &*self.program
    }

    /// Allocate a new empty block. The cursor does not move.
    pub fn new_block(&mut self) -> BlockId {
        self.program.new_block()
    }

    // Cursor management

    /// Current `(block, index)` insertion point.
    pub fn insertion_point(&self) -> Option<(BlockId, usize)> {
        self.cursor.map(|c| (c.block, c.index))
    }

    /// Insert subsequent operations before position `index` of `block`.
    pub fn set_insertion_point(&mut self, block: BlockId, index: usize) -> Result<(), BuildError> {
        let len = self.block_len(block)?;
        if index > len {
            return Err(BuildError::InsertOutOfRange { block, index, len });
        }
        self.cursor = Some(Cursor { block, index });
        Ok(())
    }

    pub fn set_insertion_point_to_start(&mut self, block: BlockId) -> Result<(), BuildError> {
        self.set_insertion_point(block, 0)
    }

    pub fn set_insertion_point_to_end(&mut self, block: BlockId) -> Result<(), BuildError> {
        let len = self.block_len(block)?;
        self.set_insertion_point(block, len)
    }

    pub fn clear_insertion_point(&mut self) {
        self.cursor = None;
    }

    fn block_len(&self, block: BlockId) -> Result<usize, BuildError> {
        self.program
            .block(block)
            .map(|b| b.len())
            .ok_or(BuildError::UnknownBlock { block })
    }

    // Operation creation

    /// Create an operation and insert it at the cursor.
    ///
    /// The op name must be registered and every operand must be a value of
    /// this program.
    pub fn create(&mut self, argument: OperationArgument) -> Result<OpId, BuildError> {
        let OperationArgument {
            name,
            operands,
            result_types,
            attributes,
        } = argument;

        if !self.ctx.is_registered_op(&name) {
            return Err(BuildError::UnregisteredOp { name });
        }
        if let Some((index, &value)) = operands
            .iter()
            .enumerate()
            .find(|(_, value)| !self.program.contains_value(**value))
        {
            return Err(BuildError::UnknownValue {
                op: name,
                index,
                value,
            });
        }

        let op = self
            .program
            .push_operation(name, operands, result_types, attributes);

        match &mut self.cursor {
            Some(cursor) => {
                self.program.insert_op(cursor.block, cursor.index, op);
                cursor.index += 1;
            }
            None => {
                tracing::warn!(
                    op = self.program.op(op).name(),
                    "builder has no insertion point, operation left detached"
                );
            }
        }
        Ok(op)
    }

    /// Create an operation and return its first result.
    pub fn create_value(&mut self, argument: OperationArgument) -> Result<ValueId, BuildError> {
        let op = self.create(argument)?;
        let operation = self.program.op(op);
        operation.result(0).ok_or_else(|| BuildError::NoResult {
            op: operation.name().to_owned(),
        })
    }

    // Type and attribute helpers

    pub fn bool_type(&self) -> Type {
        BoolType::get(self.ctx)
    }

    pub fn int32_type(&self) -> Type {
        Int32Type::get(self.ctx)
    }

    pub fn int64_type(&self) -> Type {
        Int64Type::get(self.ctx)
    }

    pub fn float32_type(&self) -> Type {
        Float32Type::get(self.ctx)
    }

    pub fn float64_type(&self) -> Type {
        Float64Type::get(self.ctx)
    }

    pub fn vec_type(&self, elements: Vec<Type>) -> Type {
        VectorType::get(self.ctx, elements)
    }

    pub fn str_attr(&self, value: impl Into<String>) -> Attribute {
        StrAttribute::get(self.ctx, value)
    }

    pub fn bool_attr(&self, value: bool) -> Attribute {
        BoolAttribute::get(self.ctx, value)
    }

    pub fn int32_attr(&self, value: i32) -> Attribute {
        Int32Attribute::get(self.ctx, value)
    }

    pub fn int64_attr(&self, value: i64) -> Attribute {
        Int64Attribute::get(self.ctx, value)
    }

    pub fn float_attr(&self, value: f32) -> Attribute {
        FloatAttribute::get(self.ctx, value)
    }

    pub fn double_attr(&self, value: f64) -> Attribute {
        DoubleAttribute::get(self.ctx, value)
    }

    pub fn array_attr(&self, elements: Vec<Attribute>) -> Attribute {
        ArrayAttribute::get(self.ctx, elements)
    }
}
