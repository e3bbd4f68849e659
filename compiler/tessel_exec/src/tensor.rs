//! Dense tensor payloads.
//!
//! A [`DenseTensor`] is metadata (dims, dtype, lod) plus an optional shared
//! byte buffer. Sharing a tensor clones the buffer handle, not the bytes, so
//! writes through one tensor are visible through every tensor sharing it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

/// Ragged sequence offsets, one level per entry.
pub type Lod = Vec<Vec<usize>>;

/// Element type of a tensor buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int8,
    UInt8,
    Int16,
    Int32,
    Int64,
    Float16,
    #[default]
    Float32,
    Float64,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DataType::Bool | DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::Float16 => 2,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Bool => "bool",
            DataType::Int8 => "i8",
            DataType::UInt8 => "u8",
            DataType::Int16 => "i16",
            DataType::Int32 => "i32",
            DataType::Int64 => "i64",
            DataType::Float16 => "f16",
            DataType::Float32 => "f32",
            DataType::Float64 => "f64",
        })
    }
}

/// Error raised by typed tensor access.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    #[error("tensor has no buffer")]
    Uninitialized,
    #[error("tensor holds `{found}` elements, not `{expected}`")]
    DataType { expected: DataType, found: DataType },
    #[error("element {index} is out of bounds for tensor of {len} elements")]
    OutOfBounds { index: usize, len: usize },
}

type Buffer = Arc<RwLock<Vec<u8>>>;

/// Dense tensor with a shareable buffer.
#[derive(Clone, Debug, Default)]
pub struct DenseTensor {
    buffer: Option<Buffer>,
    dims: SmallVec<[i64; 4]>,
    dtype: DataType,
    lod: Lod,
}

impl DenseTensor {
    /// An `f32` tensor owning a copy of `data`.
    pub fn from_f32(dims: &[i64], data: &[f32]) -> Self {
        let bytes = data.iter().flat_map(|value| value.to_le_bytes()).collect();
        DenseTensor {
            buffer: Some(Arc::new(RwLock::new(bytes))),
            dims: SmallVec::from_slice(dims),
            dtype: DataType::Float32,
            lod: Lod::new(),
        }
    }

    /// Returns `true` once a buffer is attached.
    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Element count implied by `dims`; zero for unknown dimensions.
    pub fn numel(&self) -> usize {
        self.dims
            .iter()
            .map(|&d| usize::try_from(d).unwrap_or(0))
            .product()
    }

    pub fn lod(&self) -> &Lod {
        &self.lod
    }

    pub fn set_lod(&mut self, lod: Lod) {
        self.lod = lod;
    }

    /// Point this tensor at `other`'s buffer and copy its dims and dtype.
    ///
    /// The lod is left alone; callers that need it copy it separately.
    pub fn share_data_with(&mut self, other: &DenseTensor) {
        self.buffer.clone_from(&other.buffer);
        self.dims.clone_from(&other.dims);
        self.dtype = other.dtype;
    }

    /// Returns `true` if both tensors read and write the same buffer.
    pub fn shares_data_with(&self, other: &DenseTensor) -> bool {
        match (&self.buffer, &other.buffer) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn f32_buffer(&self) -> Result<&Buffer, TensorError> {
        if self.dtype != DataType::Float32 {
            return Err(TensorError::DataType {
                expected: DataType::Float32,
                found: self.dtype,
            });
        }
        self.buffer.as_ref().ok_or(TensorError::Uninitialized)
    }

    /// Copy the buffer out as `f32` values.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        let bytes = self.f32_buffer()?.read();
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Overwrite element `index` of an `f32` buffer.
    ///
    /// Takes `&self`: the write goes to the shared buffer.
    pub fn write_f32(&self, index: usize, value: f32) -> Result<(), TensorError> {
        let mut bytes = self.f32_buffer()?.write();
        let len = bytes.len() / 4;
        let slot = index
            .checked_mul(4)
            .and_then(|start| bytes.get_mut(start..start.checked_add(4)?))
            .ok_or(TensorError::OutOfBounds { index, len })?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
