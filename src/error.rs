//! Error types for map operations and invariant validation.

use crate::surrogate::SurrogateId;
use thiserror::Error;

/// Errors returned by fallible `PolyKeyMap` operations.
///
/// A failed operation never leaves the map partially updated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The key is already registered in its key space, or `link` was given
    /// two keys that both resolve to stored values.
    #[error("key already exists in key space")]
    KeyConflict,
    /// The queried key is not registered, or `link` was given two keys that
    /// both are absent.
    #[error("key does not exist in key space")]
    NotFound,
    /// Surrogate id allocation is exhausted.
    #[error("surrogate id space exhausted")]
    CapacityExceeded,
}

/// Result type for map operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A broken cross-structure invariant, reported by `PolyKeyMap::validate`.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("{values} stored values but {bundles} key bundles")]
    StoreSizeMismatch { values: usize, bundles: usize },
    #[error("stored value {0} has no key bundle")]
    MissingBundle(SurrogateId),
    #[error("key bundle stored under {stored} records id {recorded}")]
    WrongSurrogateId {
        stored: SurrogateId,
        recorded: SurrogateId,
    },
    #[error("value {0} is not reachable by any key")]
    Unreachable(SurrogateId),
    #[error("id {0} was never issued by the allocator")]
    UnissuedId(SurrogateId),
    #[error("key in space {space} points to {id}, which has no key bundle")]
    DanglingKey { space: usize, id: SurrogateId },
    #[error("key in space {space} points to {id}, whose bundle holds a different key")]
    SlotMismatch { space: usize, id: SurrogateId },
    #[error("{indexed} keys indexed but {slotted} keys held by bundles")]
    UnindexedKeys { indexed: usize, slotted: usize },
}
