//! Iteration over stored values, with per-value key introspection.
//!
//! `Iter`/`IterMut` are ordinary single-pass iterators. `Cursor`/`CursorMut`
//! are explicit traversal positions; `CursorMut::remove_current` erases the
//! value under the cursor and leaves it on the next value not yet visited.
//!
//! Traversal order is the value store's order. It is stable while the map is
//! not modified; erasing moves the last value into the erased position.

use crate::key_bundle::KeyBundle;
use crate::key_space::{KeyOf, KeySpace, KeySpaces};
use crate::poly_key_map::PolyKeyMap;
use crate::surrogate::SurrogateId;
use core::hash::BuildHasher;
use core::iter::FusedIterator;
use hashbrown::HashMap;

pub(crate) fn bundle_of<'a, Ks, S>(
    bundles: &'a HashMap<SurrogateId, KeyBundle<Ks>, S>,
    id: &SurrogateId,
) -> &'a KeyBundle<Ks>
where
    Ks: KeySpaces,
    S: BuildHasher,
{
    bundles
        .get(id)
        .expect("stored value without a key bundle")
}

/// Shared view of one stored value and the keys linking to it.
pub struct Entry<'a, V, Ks: KeySpaces> {
    id: SurrogateId,
    value: &'a V,
    keys: &'a KeyBundle<Ks>,
}

impl<'a, V, Ks: KeySpaces> Entry<'a, V, Ks> {
    pub(crate) fn new(id: SurrogateId, value: &'a V, keys: &'a KeyBundle<Ks>) -> Self {
        Self { id, value, keys }
    }

    pub fn value(&self) -> &'a V {
        self.value
    }

    pub fn keys(&self) -> &'a KeyBundle<Ks> {
        self.keys
    }

    pub fn surrogate_id(&self) -> SurrogateId {
        self.id
    }

    pub fn has_key<const P: usize>(&self) -> bool
    where
        Ks: KeySpace<P>,
    {
        self.keys.has_key::<P>()
    }

    pub fn key<const P: usize>(&self) -> Option<&'a KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        self.keys.key::<P>()
    }
}

impl<'a, V, Ks: KeySpaces> Clone for Entry<'a, V, Ks> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, V, Ks: KeySpaces> Copy for Entry<'a, V, Ks> {}

/// Mutable view of one stored value. Keys stay read-only.
pub struct EntryMut<'a, V, Ks: KeySpaces> {
    id: SurrogateId,
    value: &'a mut V,
    keys: &'a KeyBundle<Ks>,
}

impl<'a, V, Ks: KeySpaces> EntryMut<'a, V, Ks> {
    pub(crate) fn new(id: SurrogateId, value: &'a mut V, keys: &'a KeyBundle<Ks>) -> Self {
        Self { id, value, keys }
    }

    pub fn value(&self) -> &V {
        &*self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut *self.value
    }

    pub fn into_value_mut(self) -> &'a mut V {
        self.value
    }

    pub fn keys(&self) -> &'a KeyBundle<Ks> {
        self.keys
    }

    pub fn surrogate_id(&self) -> SurrogateId {
        self.id
    }

    pub fn has_key<const P: usize>(&self) -> bool
    where
        Ks: KeySpace<P>,
    {
        self.keys.has_key::<P>()
    }

    pub fn key<const P: usize>(&self) -> Option<&'a KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        self.keys.key::<P>()
    }
}

impl<'a, V, Ks: KeySpaces> From<EntryMut<'a, V, Ks>> for Entry<'a, V, Ks> {
    fn from(e: EntryMut<'a, V, Ks>) -> Self {
        Entry::new(e.id, e.value, e.keys)
    }
}

/// Iterator over shared entries of a `PolyKeyMap`.
pub struct Iter<'a, V, Ks: KeySpaces, S> {
    values: indexmap::map::Iter<'a, SurrogateId, V>,
    bundles: &'a HashMap<SurrogateId, KeyBundle<Ks>, S>,
}

impl<'a, V, Ks: KeySpaces, S> Iter<'a, V, Ks, S> {
    pub(crate) fn new(
        values: indexmap::map::Iter<'a, SurrogateId, V>,
        bundles: &'a HashMap<SurrogateId, KeyBundle<Ks>, S>,
    ) -> Self {
        Self { values, bundles }
    }
}

impl<'a, V, Ks: KeySpaces, S: BuildHasher> Iterator for Iter<'a, V, Ks, S> {
    type Item = Entry<'a, V, Ks>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (id, value) = self.values.next()?;
        Some(Entry::new(*id, value, bundle_of(self.bundles, id)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<V, Ks: KeySpaces, S: BuildHasher> ExactSizeIterator for Iter<'_, V, Ks, S> {}
impl<V, Ks: KeySpaces, S: BuildHasher> FusedIterator for Iter<'_, V, Ks, S> {}

/// Iterator over mutable entries of a `PolyKeyMap`.
pub struct IterMut<'a, V, Ks: KeySpaces, S> {
    values: indexmap::map::IterMut<'a, SurrogateId, V>,
    bundles: &'a HashMap<SurrogateId, KeyBundle<Ks>, S>,
}

impl<'a, V, Ks: KeySpaces, S> IterMut<'a, V, Ks, S> {
    pub(crate) fn new(
        values: indexmap::map::IterMut<'a, SurrogateId, V>,
        bundles: &'a HashMap<SurrogateId, KeyBundle<Ks>, S>,
    ) -> Self {
        Self { values, bundles }
    }
}

impl<'a, V, Ks: KeySpaces, S: BuildHasher> Iterator for IterMut<'a, V, Ks, S> {
    type Item = EntryMut<'a, V, Ks>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (id, value) = self.values.next()?;
        Some(EntryMut::new(*id, value, bundle_of(self.bundles, id)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<V, Ks: KeySpaces, S: BuildHasher> ExactSizeIterator for IterMut<'_, V, Ks, S> {}
impl<V, Ks: KeySpaces, S: BuildHasher> FusedIterator for IterMut<'_, V, Ks, S> {}

/// Read-only traversal position. Several cursors over the same map may be
/// held at once; none of them can outlive a modification of the map.
pub struct Cursor<'a, V, Ks: KeySpaces, S> {
    map: &'a PolyKeyMap<V, Ks, S>,
    index: usize,
}

impl<'a, V, Ks: KeySpaces, S: BuildHasher> Cursor<'a, V, Ks, S> {
    pub(crate) fn new(map: &'a PolyKeyMap<V, Ks, S>) -> Self {
        Self { map, index: 0 }
    }

    /// The entry under the cursor, or `None` past the last value.
    pub fn current(&self) -> Option<Entry<'a, V, Ks>> {
        self.map.entry_at(self.index)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.current().map(|e| e.value())
    }

    pub fn has_key<const P: usize>(&self) -> bool
    where
        Ks: KeySpace<P>,
    {
        self.current().is_some_and(|e| e.has_key::<P>())
    }

    pub fn key<const P: usize>(&self) -> Option<&'a KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        self.current()?.key::<P>()
    }

    pub fn move_next(&mut self) {
        if self.index < self.map.len() {
            self.index += 1;
        }
    }

    pub fn is_end(&self) -> bool {
        self.index >= self.map.len()
    }
}

impl<'a, V, Ks: KeySpaces, S> Clone for Cursor<'a, V, Ks, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, V, Ks: KeySpaces, S> Copy for Cursor<'a, V, Ks, S> {}

impl<'a, V, Ks: KeySpaces, S> PartialEq for Cursor<'a, V, Ks, S> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.map, other.map) && self.index == other.index
    }
}

impl<'a, V, Ks: KeySpaces, S> Eq for Cursor<'a, V, Ks, S> {}

/// Traversal position that can modify or erase the value under it.
pub struct CursorMut<'a, V, Ks: KeySpaces, S> {
    map: &'a mut PolyKeyMap<V, Ks, S>,
    index: usize,
}

impl<'a, V, Ks: KeySpaces, S: BuildHasher> CursorMut<'a, V, Ks, S> {
    pub(crate) fn new(map: &'a mut PolyKeyMap<V, Ks, S>) -> Self {
        Self { map, index: 0 }
    }

    pub fn current(&self) -> Option<Entry<'_, V, Ks>> {
        self.map.entry_at(self.index)
    }

    pub fn current_mut(&mut self) -> Option<EntryMut<'_, V, Ks>> {
        self.map.entry_at_mut(self.index)
    }

    pub fn has_key<const P: usize>(&self) -> bool
    where
        Ks: KeySpace<P>,
    {
        self.current().is_some_and(|e| e.has_key::<P>())
    }

    pub fn key<const P: usize>(&self) -> Option<&KeyOf<Ks, P>>
    where
        Ks: KeySpace<P>,
    {
        self.current()?.key::<P>()
    }

    pub fn move_next(&mut self) {
        if self.index < self.map.len() {
            self.index += 1;
        }
    }

    pub fn is_end(&self) -> bool {
        self.index >= self.map.len()
    }

    /// Cascade-erases the value under the cursor and returns it. The cursor
    /// then rests on the next value not yet visited, so `move_next` must not
    /// be called before inspecting it.
    pub fn remove_current(&mut self) -> Option<V> {
        self.map.remove_index(self.index)
    }

    /// A read-only cursor at the same position, borrowing this one.
    pub fn as_cursor(&self) -> Cursor<'_, V, Ks, S> {
        Cursor {
            map: &*self.map,
            index: self.index,
        }
    }
}

impl<'a, V, Ks: KeySpaces, S> From<CursorMut<'a, V, Ks, S>> for Cursor<'a, V, Ks, S> {
    fn from(c: CursorMut<'a, V, Ks, S>) -> Self {
        Cursor {
            map: c.map,
            index: c.index,
        }
    }
}
