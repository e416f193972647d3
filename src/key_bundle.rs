//! KeyBundle: the per-value record of which key, if any, links to it in
//! each key space.

use crate::key_space::{KeyOf, KeySpace, KeySpaces};
use crate::surrogate::SurrogateId;
use core::fmt;

/// The keys (at most one per key space) resolving to one stored value.
///
/// The surrogate id is fixed at construction. Mutators only touch the bundle
/// itself; the owning map keeps its key indexes in sync.
pub struct KeyBundle<Ks: KeySpaces> {
    id: SurrogateId,
    pub(crate) slots: Ks::Slots,
}

impl<Ks: KeySpaces> KeyBundle<Ks> {
    pub(crate) fn new(id: SurrogateId) -> Self {
        Self {
            id,
            slots: Ks::empty_slots(),
        }
    }

    /// Stores `key` for key space `P`, returning the key it replaced.
    pub(crate) fn set_key<const P: usize>(&mut self, key: KeyOf<Ks, P>) -> Option<KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::slot_mut(&mut self.slots).replace(key)
    }

    /// Empties the slot for key space `P`, returning the key it held.
    pub(crate) fn clear_key<const P: usize>(&mut self) -> Option<KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::slot_mut(&mut self.slots).take()
    }

    pub fn has_key<const P: usize>(&self) -> bool
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::slot(&self.slots).is_some()
    }

    /// The key linking to this value in key space `P`, if one is set.
    pub fn key<const P: usize>(&self) -> Option<&KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::slot(&self.slots).as_ref()
    }

    pub fn surrogate_id(&self) -> SurrogateId {
        self.id
    }

    /// Number of key spaces with a key set.
    pub fn len(&self) -> usize {
        Ks::occupied(&self.slots)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Ks: KeySpaces> Clone for KeyBundle<Ks> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slots: self.slots.clone(),
        }
    }
}

impl<Ks: KeySpaces> fmt::Debug for KeyBundle<Ks>
where
    Ks::Slots: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBundle")
            .field("id", &self.id)
            .field("keys", &self.slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogate::SurrogateAllocator;

    type Ks = (u64, String);

    fn bundle() -> KeyBundle<Ks> {
        KeyBundle::new(SurrogateAllocator::new().next().unwrap())
    }

    #[test]
    fn new_bundle_is_empty() {
        let b = bundle();
        assert!(b.is_empty());
        assert!(!b.has_key::<0>());
        assert!(!b.has_key::<1>());
        assert_eq!(b.key::<1>(), None);
    }

    /// Invariant: `set_key` overwrites the slot for its key space only and
    /// hands back the previous key.
    #[test]
    fn set_key_overwrites_single_slot() {
        let mut b = bundle();
        assert_eq!(b.set_key::<1>("a".to_string()), None);
        assert_eq!(b.set_key::<1>("b".to_string()), Some("a".to_string()));
        assert_eq!(b.key::<1>().map(String::as_str), Some("b"));
        assert!(!b.has_key::<0>());
        assert_eq!(b.len(), 1);

        b.set_key::<0>(42);
        assert_eq!(b.len(), 2);
        assert_eq!(b.key::<0>(), Some(&42));
        assert_eq!(b.key::<1>().map(String::as_str), Some("b"));
    }

    /// Invariant: `clear_key` empties one slot only and hands back its key;
    /// clearing an empty slot is a no-op.
    #[test]
    fn clear_key_empties_single_slot() {
        let mut b = bundle();
        b.set_key::<0>(42);
        b.set_key::<1>("b".to_string());

        assert_eq!(b.clear_key::<1>(), Some("b".to_string()));
        assert_eq!(b.clear_key::<1>(), None);
        assert!(!b.has_key::<1>());
        assert_eq!(b.key::<0>(), Some(&42));
        assert_eq!(b.len(), 1);
    }

    /// Invariant: a clone carries the same surrogate id and keys, and evolves
    /// independently afterwards.
    #[test]
    fn clone_is_independent() {
        let mut original = bundle();
        original.set_key::<0>(7);
        let mut copy = original.clone();
        assert_eq!(copy.surrogate_id(), original.surrogate_id());
        assert_eq!(copy.key::<0>(), Some(&7));

        copy.set_key::<1>("x".to_string());
        copy.set_key::<0>(8);
        assert_eq!(copy.key::<0>(), Some(&8));
        assert_eq!(original.key::<0>(), Some(&7));
        assert!(!original.has_key::<1>());
    }
}
