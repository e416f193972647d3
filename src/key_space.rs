//! Compile-time key-space lists.
//!
//! A map's key spaces are a tuple of key types, `(K0, K1, ...)`. `KeySpaces`
//! describes the whole list (the per-value slot tuple and the per-space index
//! tuple); `KeySpace<P>` selects the space at position `P`. Both are sealed
//! and implemented for tuples of arity 1 through 6.

use crate::error::ValidationError;
use crate::key_bundle::KeyBundle;
use crate::surrogate::SurrogateId;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;

mod sealed {
    pub trait Sealed {}
}

/// The full, ordered list of key spaces of a map.
pub trait KeySpaces: sealed::Sealed + Sized {
    /// Number of key spaces.
    const COUNT: usize;

    /// One optional key per key space, `(Option<K0>, Option<K1>, ...)`.
    type Slots: Clone;

    /// One key index per key space, `(HashMap<K0, SurrogateId, S>, ...)`.
    type Indexes<S>;

    #[doc(hidden)]
    fn empty_slots() -> Self::Slots;

    #[doc(hidden)]
    fn occupied(slots: &Self::Slots) -> usize;

    #[doc(hidden)]
    fn new_indexes<S: Clone>(hasher: &S, capacity: usize) -> Self::Indexes<S>;

    /// Clears every slot of `bundle` and removes the key it held from that
    /// space's index.
    #[doc(hidden)]
    fn unlink_all<S: BuildHasher>(bundle: &mut KeyBundle<Self>, indexes: &mut Self::Indexes<S>);

    #[doc(hidden)]
    fn clear_indexes<S>(indexes: &mut Self::Indexes<S>);

    /// Checks that every indexed key resolves to a bundle slot holding that
    /// same key. Returns the total number of indexed keys.
    #[doc(hidden)]
    fn validate_indexes<S: BuildHasher>(
        indexes: &Self::Indexes<S>,
        bundles: &HashMap<SurrogateId, KeyBundle<Self>, S>,
    ) -> Result<usize, ValidationError>;
}

/// Selects the key space at position `P` of a key-space list.
pub trait KeySpace<const P: usize>: KeySpaces {
    type Key: Eq + Hash + Clone;

    #[doc(hidden)]
    fn slot(slots: &Self::Slots) -> &Option<Self::Key>;

    #[doc(hidden)]
    fn slot_mut(slots: &mut Self::Slots) -> &mut Option<Self::Key>;

    #[doc(hidden)]
    fn index<S>(indexes: &Self::Indexes<S>) -> &HashMap<Self::Key, SurrogateId, S>;

    #[doc(hidden)]
    fn index_mut<S>(indexes: &mut Self::Indexes<S>) -> &mut HashMap<Self::Key, SurrogateId, S>;
}

/// Key type of the key space at position `P`.
pub type KeyOf<Ks, const P: usize> = <Ks as KeySpace<P>>::Key;

macro_rules! key_spaces {
    (@each $all:tt; $($idx:tt => $K:ident),+) => {
        $( key_spaces!(@one $all; $idx => $K); )+
    };
    (@one [$($A:ident),+]; $idx:tt => $K:ident) => {
        impl<$($A),+> KeySpace<$idx> for ($($A,)+)
        where
            $($A: Eq + Hash + Clone),+
        {
            type Key = $K;

            #[inline]
            fn slot(slots: &Self::Slots) -> &Option<$K> {
                &slots.$idx
            }

            #[inline]
            fn slot_mut(slots: &mut Self::Slots) -> &mut Option<$K> {
                &mut slots.$idx
            }

            #[inline]
            fn index<S>(indexes: &Self::Indexes<S>) -> &HashMap<$K, SurrogateId, S> {
                &indexes.$idx
            }

            #[inline]
            fn index_mut<S>(indexes: &mut Self::Indexes<S>) -> &mut HashMap<$K, SurrogateId, S> {
                &mut indexes.$idx
            }
        }
    };
    ($count:expr; $($idx:tt => $K:ident),+) => {
        impl<$($K),+> sealed::Sealed for ($($K,)+) {}

        impl<$($K),+> KeySpaces for ($($K,)+)
        where
            $($K: Eq + Hash + Clone),+
        {
            const COUNT: usize = $count;

            type Slots = ($(Option<$K>,)+);

            type Indexes<S> = ($(HashMap<$K, SurrogateId, S>,)+);

            fn empty_slots() -> Self::Slots {
                ($(None::<$K>,)+)
            }

            fn occupied(slots: &Self::Slots) -> usize {
                0 $(+ usize::from(slots.$idx.is_some()))+
            }

            fn new_indexes<S: Clone>(hasher: &S, capacity: usize) -> Self::Indexes<S> {
                ($(HashMap::<$K, SurrogateId, S>::with_capacity_and_hasher(capacity, hasher.clone()),)+)
            }

            fn unlink_all<S: BuildHasher>(bundle: &mut KeyBundle<Self>, indexes: &mut Self::Indexes<S>) {
                $(
                    if let Some(key) = bundle.clear_key::<$idx>() {
                        indexes.$idx.remove(&key);
                    }
                )+
            }

            fn clear_indexes<S>(indexes: &mut Self::Indexes<S>) {
                $( indexes.$idx.clear(); )+
            }

            fn validate_indexes<S: BuildHasher>(
                indexes: &Self::Indexes<S>,
                bundles: &HashMap<SurrogateId, KeyBundle<Self>, S>,
            ) -> Result<usize, ValidationError> {
                let mut total = 0;
                $(
                    for (key, &id) in indexes.$idx.iter() {
                        let bundle = bundles
                            .get(&id)
                            .ok_or(ValidationError::DanglingKey { space: $idx, id })?;
                        if bundle.slots.$idx.as_ref() != Some(key) {
                            return Err(ValidationError::SlotMismatch { space: $idx, id });
                        }
                    }
                    total += indexes.$idx.len();
                )+
                Ok(total)
            }
        }

        key_spaces!(@each [$($K),+]; $($idx => $K),+);
    };
}

key_spaces!(1; 0 => K0);
key_spaces!(2; 0 => K0, 1 => K1);
key_spaces!(3; 0 => K0, 1 => K1, 2 => K2);
key_spaces!(4; 0 => K0, 1 => K1, 2 => K2, 3 => K3);
key_spaces!(5; 0 => K0, 1 => K1, 2 => K2, 3 => K3, 4 => K4);
key_spaces!(6; 0 => K0, 1 => K1, 2 => K2, 3 => K3, 4 => K4, 5 => K5);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;

    type Ks = (u32, String, char);

    #[test]
    fn count_matches_arity() {
        assert_eq!(<(u8,) as KeySpaces>::COUNT, 1);
        assert_eq!(<Ks as KeySpaces>::COUNT, 3);
        assert_eq!(<(u8, u8, u8, u8, u8, u8) as KeySpaces>::COUNT, 6);
    }

    /// Invariant: slot selection by position addresses exactly one slot.
    #[test]
    fn slots_are_independent() {
        let mut slots = Ks::empty_slots();
        assert_eq!(Ks::occupied(&slots), 0);

        *<Ks as KeySpace<1>>::slot_mut(&mut slots) = Some("ext".to_string());
        assert_eq!(Ks::occupied(&slots), 1);
        assert!(<Ks as KeySpace<0>>::slot(&slots).is_none());
        assert_eq!(<Ks as KeySpace<1>>::slot(&slots).as_deref(), Some("ext"));
        assert!(<Ks as KeySpace<2>>::slot(&slots).is_none());
    }

    /// Invariant: `unlink_all` removes exactly the keys held by the bundle, from
    /// their own indexes, and leaves the bundle empty.
    #[test]
    fn unlink_all_removes_only_held_keys() {
        let hasher = RandomState::new();
        let mut indexes = Ks::new_indexes(&hasher, 0);
        let mut ids = crate::surrogate::SurrogateAllocator::new();
        let a = ids.next().unwrap();
        let b = ids.next().unwrap();

        <Ks as KeySpace<0>>::index_mut::<RandomState>(&mut indexes).insert(7, a);
        <Ks as KeySpace<2>>::index_mut::<RandomState>(&mut indexes).insert('x', a);
        <Ks as KeySpace<0>>::index_mut::<RandomState>(&mut indexes).insert(8, b);

        let mut bundle = KeyBundle::<Ks>::new(a);
        bundle.set_key::<0>(7);
        bundle.set_key::<2>('x');

        Ks::unlink_all::<RandomState>(&mut bundle, &mut indexes);

        assert!(bundle.is_empty());
        assert_eq!(bundle.surrogate_id(), a);
        assert!(!<Ks as KeySpace<0>>::index::<RandomState>(&indexes).contains_key(&7));
        assert!(!<Ks as KeySpace<2>>::index::<RandomState>(&indexes).contains_key(&'x'));
        assert_eq!(<Ks as KeySpace<0>>::index::<RandomState>(&indexes).get(&8), Some(&b));

        Ks::clear_indexes::<RandomState>(&mut indexes);
        assert!(<Ks as KeySpace<0>>::index::<RandomState>(&indexes).is_empty());
    }
}
