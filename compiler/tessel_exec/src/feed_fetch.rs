//! Feed and fetch channels.
//!
//! Inputs reach a program through the root variable `feed`, a column-indexed
//! feed list; outputs leave through `fetch`, a column-indexed list of
//! optional tensors. The binder reads `feed` and sizes `fetch`; these helpers
//! are for the code around it.

use crate::scope::{ScopeError, ScopeTree};
use crate::tensor::DenseTensor;
use crate::variable::{FeedItem, PayloadError};

/// Name of the root feed variable.
pub const FEED_VAR: &str = "feed";
/// Name of the root fetch variable.
pub const FETCH_VAR: &str = "fetch";

/// Error raised by the feed/fetch helpers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeedFetchError {
    #[error("the root scope has no `{name}` variable")]
    MissingVariable { name: &'static str },
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Store `item` at column `col` of the root feed list, growing it as needed.
pub fn set_feed_item(
    scopes: &mut ScopeTree,
    item: FeedItem,
    col: usize,
) -> Result<(), FeedFetchError> {
    let var = scopes.create(scopes.root(), FEED_VAR)?;
    let items = scopes.var_mut(var)?.get_mutable_feed_list()?;
    if items.len() <= col {
        items.resize_with(col + 1, || FeedItem::Tensor(DenseTensor::default()));
    }
    items[col] = item;
    Ok(())
}

/// Store `tensor` at column `col` of the root feed list.
pub fn set_feed_variable(
    scopes: &mut ScopeTree,
    tensor: DenseTensor,
    col: usize,
) -> Result<(), FeedFetchError> {
    set_feed_item(scopes, FeedItem::Tensor(tensor), col)
}

/// Store `tensor` at column `col` of the root fetch list, growing it as needed.
pub fn set_fetch_variable(
    scopes: &mut ScopeTree,
    tensor: DenseTensor,
    col: usize,
) -> Result<(), FeedFetchError> {
    let var = scopes.create(scopes.root(), FETCH_VAR)?;
    let slots = scopes.var_mut(var)?.get_mutable_fetch_list()?;
    if slots.len() <= col {
        slots.resize(col + 1, None);
    }
    slots[col] = Some(tensor);
    Ok(())
}

/// Tensor at column `col` of the root fetch list.
///
/// `Ok(None)` means the column is unwritten or beyond the list.
pub fn get_fetch_variable(
    scopes: &ScopeTree,
    col: usize,
) -> Result<Option<&DenseTensor>, FeedFetchError> {
    let var = scopes
        .find_local(scopes.root(), FETCH_VAR)
        .ok_or(FeedFetchError::MissingVariable { name: FETCH_VAR })?;
    let slots = scopes.var(var)?.fetch_list()?;
    Ok(slots.get(col).and_then(Option::as_ref))
}
