//! Surrogate ids: the internal identity joining a value to its key bundle.

use crate::error::{Error, Result};
use core::fmt;

/// Opaque identity minted once per inserted value. Never reused within the
/// lifetime of a map.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SurrogateId(u64);

impl SurrogateId {
    /// Raw counter value, for diagnostics.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Strictly increasing id source. Once `u64::MAX` has been handed out every
/// further request fails with `CapacityExceeded`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct SurrogateAllocator {
    // None once the counter is spent.
    next: Option<u64>,
}

impl SurrogateAllocator {
    pub(crate) const INITIAL: u64 = 0;

    pub(crate) const fn new() -> Self {
        Self::starting_at(Self::INITIAL)
    }

    pub(crate) const fn starting_at(first: u64) -> Self {
        Self { next: Some(first) }
    }

    pub(crate) fn next(&mut self) -> Result<SurrogateId> {
        let Some(id) = self.next else {
            tracing::debug!("surrogate id allocation exhausted");
            return Err(Error::CapacityExceeded);
        };
        self.next = id.checked_add(1);
        Ok(SurrogateId(id))
    }

    /// Whether `id` has been handed out by this allocator.
    pub(crate) fn has_issued(&self, id: SurrogateId) -> bool {
        match self.next {
            Some(next) => id.0 < next,
            None => true,
        }
    }
}

impl Default for SurrogateAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: ids are strictly increasing from the initial value.
    #[test]
    fn ids_increase_from_initial() {
        let mut a = SurrogateAllocator::new();
        let ids: Vec<u64> = (0..4).map(|_| a.next().unwrap().get()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    /// Invariant: the last representable id is issued once, then allocation
    /// fails instead of wrapping to an id that was already handed out.
    #[test]
    fn exhaustion_fails_instead_of_wrapping() {
        let mut a = SurrogateAllocator::starting_at(u64::MAX - 1);
        assert_eq!(a.next().unwrap().get(), u64::MAX - 1);
        assert_eq!(a.next().unwrap().get(), u64::MAX);
        assert_eq!(a.next(), Err(Error::CapacityExceeded));
        assert_eq!(a.next(), Err(Error::CapacityExceeded));
    }

    #[test]
    fn has_issued_tracks_counter() {
        let mut a = SurrogateAllocator::new();
        let first = a.next().unwrap();
        assert!(a.has_issued(first));
        assert!(!a.has_issued(SurrogateId(1)));

        let mut spent = SurrogateAllocator::starting_at(u64::MAX);
        let last = spent.next().unwrap();
        assert!(spent.has_issued(last));
        assert!(spent.has_issued(SurrogateId(0)));
    }
}
