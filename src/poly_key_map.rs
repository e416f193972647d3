//! PolyKeyMap: one value store addressed through several key spaces.
//!
//! Layout: each key space owns an index `key -> SurrogateId`; the value store
//! and the key-bundle store are both keyed by `SurrogateId`. Every mutation
//! updates all three together before returning.

use crate::error::{Error, Result, ValidationError};
use crate::iter::{bundle_of, Cursor, CursorMut, Entry, EntryMut, Iter, IterMut};
use crate::key_bundle::KeyBundle;
use crate::key_space::{KeyOf, KeySpace, KeySpaces};
use crate::surrogate::{SurrogateAllocator, SurrogateId};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::Entry as IndexEntry;
use hashbrown::{Equivalent, HashMap};
use indexmap::IndexMap;
use std::collections::hash_map::RandomState;

/// A map storing values of type `V`, each reachable through at most one key
/// per key space of the tuple `Ks`.
///
/// Key spaces are chosen by position at compile time:
///
/// ```
/// use polykey_map::PolyKeyMap;
///
/// const INTERNAL: usize = 0;
/// const EXTERNAL: usize = 1;
///
/// let mut orders: PolyKeyMap<&str, (u64, String)> = PolyKeyMap::new();
/// orders.insert::<INTERNAL>(13, "AAPL").unwrap();
/// orders.link::<INTERNAL, EXTERNAL>(13, "1337".to_string()).unwrap();
/// assert_eq!(orders.at::<EXTERNAL>("1337"), Ok(&"AAPL"));
///
/// orders.erase::<EXTERNAL>("1337").unwrap();
/// assert!(!orders.contains::<INTERNAL>(&13u64));
/// ```
pub struct PolyKeyMap<V, Ks: KeySpaces, S = RandomState> {
    ids: SurrogateAllocator,
    values: IndexMap<SurrogateId, V, S>,
    bundles: HashMap<SurrogateId, KeyBundle<Ks>, S>,
    indexes: Ks::Indexes<S>,
}

impl<V, Ks: KeySpaces> PolyKeyMap<V, Ks> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<V, Ks: KeySpaces, S: Clone> PolyKeyMap<V, Ks, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Pre-sizes the value store, the bundle store and every key index for
    /// `capacity` values.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            ids: SurrogateAllocator::new(),
            indexes: Ks::new_indexes::<S>(&hasher, capacity),
            bundles: HashMap::with_capacity_and_hasher(capacity, hasher.clone()),
            values: IndexMap::with_capacity_and_hasher(capacity, hasher),
        }
    }
}

impl<V, Ks, S> PolyKeyMap<V, Ks, S>
where
    Ks: KeySpaces,
    S: BuildHasher,
{
    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of keys registered in key space `P`.
    pub fn len_of<const P: usize>(&self) -> usize
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::index::<S>(&self.indexes).len()
    }

    fn id_of<const P: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Option<SurrogateId>
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::index::<S>(&self.indexes)
            .get(key)
            .copied()
    }

    fn bundle_by_key<const P: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Result<&KeyBundle<Ks>>
    where
        Ks: KeySpace<P>,
    {
        let id = self.id_of::<P>(key).ok_or(Error::NotFound)?;
        self.bundles.get(&id).ok_or(Error::NotFound)
    }

    /// Whether `key` is registered in key space `P`.
    pub fn contains<const P: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> bool
    where
        Ks: KeySpace<P>,
    {
        <Ks as KeySpace<P>>::index::<S>(&self.indexes).contains_key(key)
    }

    pub fn get<const P: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Option<&V>
    where
        Ks: KeySpace<P>,
    {
        let id = self.id_of::<P>(key)?;
        self.values.get(&id)
    }

    pub fn get_mut<const P: usize>(
        &mut self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Option<&mut V>
    where
        Ks: KeySpace<P>,
    {
        let id = self.id_of::<P>(key)?;
        self.values.get_mut(&id)
    }

    /// The value `key` resolves to in key space `P`.
    pub fn at<const P: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Result<&V>
    where
        Ks: KeySpace<P>,
    {
        self.get::<P>(key).ok_or(Error::NotFound)
    }

    pub fn at_mut<const P: usize>(
        &mut self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Result<&mut V>
    where
        Ks: KeySpace<P>,
    {
        self.get_mut::<P>(key).ok_or(Error::NotFound)
    }

    /// Whether the value reached by `key` in space `P1` also has a key in
    /// space `P2`. Fails with `NotFound` if `key` is absent.
    pub fn is_linked<const P1: usize, const P2: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P1>>),
    ) -> Result<bool>
    where
        Ks: KeySpace<P1> + KeySpace<P2>,
    {
        Ok(self.bundle_by_key::<P1>(key)?.has_key::<P2>())
    }

    /// Translates `key` from space `P1` into the key of the same value in
    /// space `P2`. Fails with `NotFound` if `key` is absent or the value has
    /// no key in `P2`.
    pub fn convert_key<const P1: usize, const P2: usize>(
        &self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P1>>),
    ) -> Result<&KeyOf<Ks, P2>>
    where
        Ks: KeySpace<P1> + KeySpace<P2>,
    {
        self.bundle_by_key::<P1>(key)?
            .key::<P2>()
            .ok_or(Error::NotFound)
    }

    /// Stores `value` reachable by `key` in key space `P`; every other key
    /// space starts empty for it.
    pub fn insert<const P: usize>(&mut self, key: KeyOf<Ks, P>, value: V) -> Result<()>
    where
        Ks: KeySpace<P>,
    {
        self.insert_with::<P>(key, || value)
    }

    /// Like `insert`, but `default` only runs once the insertion is known to
    /// succeed.
    pub fn insert_with<const P: usize>(
        &mut self,
        key: KeyOf<Ks, P>,
        default: impl FnOnce() -> V,
    ) -> Result<()>
    where
        Ks: KeySpace<P>,
    {
        let index = <Ks as KeySpace<P>>::index_mut::<S>(&mut self.indexes);
        let IndexEntry::Vacant(vacant) = index.entry(key) else {
            return Err(Error::KeyConflict);
        };
        let id = self.ids.next()?;
        let value = default();

        let mut bundle = KeyBundle::new(id);
        bundle.set_key::<P>(vacant.key().clone());
        vacant.insert(id);
        self.bundles.insert(id, bundle);
        self.values.insert(id, value);
        tracing::trace!(%id, space = P, "inserted value");
        Ok(())
    }

    /// Makes the value reached by one of the keys reachable by the other too.
    ///
    /// Exactly one of `key1` / `key2` must already be registered. Both present
    /// fails with `KeyConflict`, both absent with `NotFound`. Linking into a key
    /// space where the value already has a key also fails with `KeyConflict`.
    pub fn link<const P1: usize, const P2: usize>(
        &mut self,
        key1: KeyOf<Ks, P1>,
        key2: KeyOf<Ks, P2>,
    ) -> Result<()>
    where
        Ks: KeySpace<P1> + KeySpace<P2>,
    {
        const { assert!(P1 != P2, "link requires two distinct key spaces") };

        match (self.id_of::<P1>(&key1), self.id_of::<P2>(&key2)) {
            (Some(_), Some(_)) => Err(Error::KeyConflict),
            (None, None) => Err(Error::NotFound),
            (Some(id), None) => self.attach::<P2>(id, key2),
            (None, Some(id)) => self.attach::<P1>(id, key1),
        }
    }

    fn attach<const P: usize>(&mut self, id: SurrogateId, key: KeyOf<Ks, P>) -> Result<()>
    where
        Ks: KeySpace<P>,
    {
        let bundle = self.bundles.get_mut(&id).ok_or(Error::NotFound)?;
        if bundle.has_key::<P>() {
            return Err(Error::KeyConflict);
        }
        <Ks as KeySpace<P>>::index_mut::<S>(&mut self.indexes).insert(key.clone(), id);
        bundle.set_key::<P>(key);
        tracing::trace!(%id, space = P, "linked key");
        Ok(())
    }

    /// Removes the value `key` resolves to, together with every key in every
    /// key space that pointed to it.
    pub fn erase<const P: usize>(
        &mut self,
        key: &(impl ?Sized + Hash + Equivalent<KeyOf<Ks, P>>),
    ) -> Result<V>
    where
        Ks: KeySpace<P>,
    {
        let id = self.id_of::<P>(key).ok_or(Error::NotFound)?;
        self.unlink(id);
        self.values.swap_remove(&id).ok_or(Error::NotFound)
    }

    /// Cascade-erases the value at traversal position `index`. The last value
    /// moves into `index`.
    pub(crate) fn remove_index(&mut self, index: usize) -> Option<V> {
        let (id, value) = self.values.swap_remove_index(index)?;
        self.unlink(id);
        Some(value)
    }

    // Drops the bundle for `id` and every index entry it names.
    fn unlink(&mut self, id: SurrogateId) {
        if let Some(mut bundle) = self.bundles.remove(&id) {
            Ks::unlink_all::<S>(&mut bundle, &mut self.indexes);
        }
        tracing::trace!(%id, "erased value");
    }

    /// Keeps only the values for which `keep` returns true; the rest are
    /// cascade-erased. Each value is visited exactly once.
    ///
    /// Every rejected value is unlinked before the next call to `keep`, so a
    /// panic in `keep` leaves a consistent map.
    pub fn retain(&mut self, mut keep: impl FnMut(EntryMut<'_, V, Ks>) -> bool) {
        let mut index = 0;
        while let Some(entry) = self.entry_at_mut(index) {
            if keep(entry) {
                index += 1;
            } else {
                self.remove_index(index);
            }
        }
    }

    /// Erases every value. Surrogate ids keep counting from where they were.
    pub fn clear(&mut self) {
        // Keys go first so a panicking value `Drop` cannot strand them.
        Ks::clear_indexes::<S>(&mut self.indexes);
        self.bundles.clear();
        self.values.clear();
        tracing::trace!("cleared map");
    }

    pub fn iter(&self) -> Iter<'_, V, Ks, S> {
        Iter::new(self.values.iter(), &self.bundles)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, V, Ks, S> {
        IterMut::new(self.values.iter_mut(), &self.bundles)
    }

    /// A read-only traversal position at the first value.
    pub fn cursor(&self) -> Cursor<'_, V, Ks, S> {
        Cursor::new(self)
    }

    /// A traversal position at the first value that can modify or erase the
    /// value under it.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, V, Ks, S> {
        CursorMut::new(self)
    }

    pub(crate) fn entry_at(&self, index: usize) -> Option<Entry<'_, V, Ks>> {
        let (id, value) = self.values.get_index(index)?;
        Some(Entry::new(*id, value, bundle_of(&self.bundles, id)))
    }

    pub(crate) fn entry_at_mut(&mut self, index: usize) -> Option<EntryMut<'_, V, Ks>> {
        let (id, value) = self.values.get_index_mut(index)?;
        let id = *id;
        Some(EntryMut::new(id, value, bundle_of(&self.bundles, &id)))
    }

    /// Checks every cross-structure invariant, reporting the first violation.
    #[doc(hidden)]
    pub fn validate(&self) -> core::result::Result<(), ValidationError> {
        if self.values.len() != self.bundles.len() {
            return Err(ValidationError::StoreSizeMismatch {
                values: self.values.len(),
                bundles: self.bundles.len(),
            });
        }

        let mut slotted = 0;
        for &id in self.values.keys() {
            let bundle = self
                .bundles
                .get(&id)
                .ok_or(ValidationError::MissingBundle(id))?;
            if bundle.surrogate_id() != id {
                return Err(ValidationError::WrongSurrogateId {
                    stored: id,
                    recorded: bundle.surrogate_id(),
                });
            }
            if !self.ids.has_issued(id) {
                return Err(ValidationError::UnissuedId(id));
            }
            if bundle.is_empty() {
                return Err(ValidationError::Unreachable(id));
            }
            slotted += bundle.len();
        }

        let indexed = Ks::validate_indexes::<S>(&self.indexes, &self.bundles)?;
        if indexed != slotted {
            return Err(ValidationError::UnindexedKeys { indexed, slotted });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with_ids_from(mut self, first: u64) -> Self {
        self.ids = SurrogateAllocator::starting_at(first);
        self
    }
}

impl<V, Ks, S> Clone for PolyKeyMap<V, Ks, S>
where
    V: Clone,
    Ks: KeySpaces,
    Ks::Indexes<S>: Clone,
    S: Clone,
{
    /// Deep copy; the copy continues the id sequence of the original.
    fn clone(&self) -> Self {
        Self {
            ids: self.ids,
            values: self.values.clone(),
            bundles: self.bundles.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<V, Ks, S> Default for PolyKeyMap<V, Ks, S>
where
    Ks: KeySpaces,
    S: Clone + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<V, Ks, S> fmt::Debug for PolyKeyMap<V, Ks, S>
where
    V: fmt::Debug,
    Ks: KeySpaces,
    Ks::Slots: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (&e.keys().slots, e.value())))
            .finish()
    }
}

impl<'a, V, Ks, S> IntoIterator for &'a PolyKeyMap<V, Ks, S>
where
    Ks: KeySpaces,
    S: BuildHasher,
{
    type Item = Entry<'a, V, Ks>;
    type IntoIter = Iter<'a, V, Ks, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V, Ks, S> IntoIterator for &'a mut PolyKeyMap<V, Ks, S>
where
    Ks: KeySpaces,
    S: BuildHasher,
{
    type Item = EntryMut<'a, V, Ks>;
    type IntoIter = IterMut<'a, V, Ks, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
