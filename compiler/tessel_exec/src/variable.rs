//! Runtime variables and their payloads.

use std::fmt;

use crate::tensor::DenseTensor;

/// Identity of a runtime variable inside a [`ScopeTree`](crate::ScopeTree).
///
/// Handles are never reused, so a `VarId` stays a valid map key even after
/// its variable is freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VarId(u32);

impl VarId {
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

/// One column of the feed list.
#[derive(Clone, Debug)]
pub enum FeedItem {
    Tensor(DenseTensor),
    Strings(Vec<String>),
}

/// What a variable holds.
#[derive(Clone, Debug, Default)]
pub enum Payload {
    #[default]
    Empty,
    DenseTensor(DenseTensor),
    /// Ordered references to other variables.
    RefArray(Vec<VarId>),
    FeedList(Vec<FeedItem>),
    /// Column-indexed fetch slots, `None` until written.
    FetchList(Vec<Option<DenseTensor>>),
}

/// Discriminant of a [`Payload`], for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Empty,
    DenseTensor,
    RefArray,
    FeedList,
    FetchList,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayloadKind::Empty => "empty",
            PayloadKind::DenseTensor => "dense tensor",
            PayloadKind::RefArray => "variable reference list",
            PayloadKind::FeedList => "feed list",
            PayloadKind::FetchList => "fetch list",
        })
    }
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Empty => PayloadKind::Empty,
            Payload::DenseTensor(_) => PayloadKind::DenseTensor,
            Payload::RefArray(_) => PayloadKind::RefArray,
            Payload::FeedList(_) => PayloadKind::FeedList,
            Payload::FetchList(_) => PayloadKind::FetchList,
        }
    }
}

/// A variable already holds a payload of another kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("variable holds a {found}, expected a {expected}")]
    Mismatch {
        expected: PayloadKind,
        found: PayloadKind,
    },
}

/// A named, mutable storage cell. The name lives in the owning scope.
#[derive(Clone, Debug, Default)]
pub struct Variable {
    payload: Payload,
}

/// Generates the typed accessors for one payload variant.
///
/// `get_mutable_*` initializes an empty variable to the default payload of
/// that kind; the read accessor never initializes.
macro_rules! payload_accessors {
    ($($variant:ident: $ty:ty => $get:ident, $get_mut:ident;)*) => {
        $(
            pub fn $get(&self) -> Result<&$ty, PayloadError> {
                match &self.payload {
                    Payload::$variant(inner) => Ok(inner),
                    other => Err(PayloadError::Mismatch {
                        expected: PayloadKind::$variant,
                        found: other.kind(),
                    }),
                }
            }

            pub fn $get_mut(&mut self) -> Result<&mut $ty, PayloadError> {
                if matches!(self.payload, Payload::Empty) {
                    self.payload = Payload::$variant(<$ty>::default());
                }
                match &mut self.payload {
                    Payload::$variant(inner) => Ok(inner),
                    other => Err(PayloadError::Mismatch {
                        expected: PayloadKind::$variant,
                        found: other.kind(),
                    }),
                }
            }
        )*
    };
}

impl Variable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// Returns `true` once a payload kind has been chosen.
    pub fn is_initialized(&self) -> bool {
        !matches!(self.payload, Payload::Empty)
    }

    /// Replace the payload, whatever it was.
    pub fn reset(&mut self, payload: Payload) {
        self.payload = payload;
    }

    payload_accessors! {
        DenseTensor: DenseTensor => dense_tensor, get_mutable_dense_tensor;
        RefArray: Vec<VarId> => ref_array, get_mutable_ref_array;
        FeedList: Vec<FeedItem> => feed_list, get_mutable_feed_list;
        FetchList: Vec<Option<DenseTensor>> => fetch_list, get_mutable_fetch_list;
    }
}
